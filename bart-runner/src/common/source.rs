use bart_engine::{SessionConfig, TableSource};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not read probability table {}", path.display())]
pub struct ReadTableError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

/// Reads the table named by `SessionConfig::table_path` from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTableSource;

impl TableSource for FileTableSource {
    type Error = ReadTableError;

    fn read_table(&self, config: &SessionConfig) -> Result<Option<String>, Self::Error> {
        let Some(path) = &config.table_path else {
            return Ok(None);
        };
        log::debug!("reading probability table from {}", path.display());
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ReadTableError {
                path: path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bart_engine::{BalloonType, BartEngine, StartError, Variant};

    #[test]
    fn missing_path_falls_back_to_bundled_table() {
        let config = SessionConfig::default();
        assert!(FileTableSource.read_table(&config).unwrap().is_none());
        let load = BartEngine::new(FileTableSource).load_table(&config).unwrap();
        assert_eq!(load.table.max_size(BalloonType::Standard), 10);
    }

    #[test]
    fn reads_table_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "bart-table-{}.csv",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&path, "size,probability\n1,0.5\n2,1.0\n").unwrap();
        let config = SessionConfig {
            table_path: Some(path),
            ..SessionConfig::default()
        };
        let load = BartEngine::new(FileTableSource).load_table(&config).unwrap();
        assert_eq!(load.table.variant(), Variant::Basic);
        assert_eq!(load.table.max_size(BalloonType::Standard), 2);
    }

    #[test]
    fn unreadable_path_names_the_file() {
        let config = SessionConfig {
            table_path: Some(PathBuf::from("/nonexistent/bart/probabilities.csv")),
            ..SessionConfig::default()
        };
        let err = BartEngine::new(FileTableSource)
            .start_session(&config)
            .err()
            .unwrap();
        assert!(matches!(err, StartError::Source(_)));
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.contains("/nonexistent/bart/probabilities.csv"));
    }
}
