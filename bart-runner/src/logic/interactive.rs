use bart_engine::{Action, RoundEvent, Session, Snapshot};
use colored::Colorize;
use rand::Rng;
use std::io::{self, BufRead, Write};

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayEnd {
    Completed,
    Quit,
}

fn render_intro(out: &mut dyn Write, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(out)?;
    let title = format!(
        "🎈 Balloon {}/{}",
        snapshot.round_index + 1,
        snapshot.rounds_total
    );
    writeln!(
        out,
        "{}: {} balloon (up to {} pumps)",
        title.bright_cyan().bold(),
        snapshot.balloon_type,
        snapshot.max_size
    )?;
    writeln!(out, "   [i] inflate   [b] bank   [q] quit")
}

fn render_state(out: &mut dyn Write, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(
        out,
        "   size {}/{}  this balloon {}  bank {}",
        snapshot.current_size, snapshot.max_size, snapshot.round_earnings, snapshot.bank_total
    )
}

fn render_event(out: &mut dyn Write, event: RoundEvent) -> io::Result<()> {
    match event {
        RoundEvent::Inflated { size, .. } => writeln!(out, "   pump! size {size}"),
        RoundEvent::Popped { size, .. } => {
            writeln!(out, "   {}", format!("💥 POP at size {size}, nothing earned").red())
        }
        RoundEvent::Banked { earnings } => {
            writeln!(out, "   {}", format!("💰 Banked {earnings}").green())
        }
    }
}

/// Play `session` from line-oriented `input`, one key per line.
///
/// Ends when every round is recorded, on `q`, or at end of input.
///
/// # Errors
///
/// Returns any I/O error from `input` or `out`.
pub fn play<R, I>(session: &mut Session<R>, input: I, out: &mut dyn Write) -> io::Result<PlayEnd>
where
    R: Rng,
    I: BufRead,
{
    let Some(first) = session.snapshot() else {
        return Ok(PlayEnd::Completed);
    };
    render_intro(out, &first)?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let key = line.trim().to_ascii_lowercase();
        if matches!(key.as_str(), "q" | "quit") {
            return Ok(PlayEnd::Quit);
        }
        let Some(snapshot) = session.snapshot() else {
            break;
        };

        let action = match key.as_str() {
            "i" | "inflate" => Action::Inflate,
            "b" | "bank" => Action::Bank,
            "" if snapshot.phase.is_terminal() => {
                if !session.next_round() {
                    break;
                }
                if let Some(next) = session.snapshot() {
                    render_intro(out, &next)?;
                }
                out.flush()?;
                continue;
            }
            "" => continue,
            other => {
                writeln!(out, "   unknown key `{other}`: i = inflate, b = bank, q = quit")?;
                out.flush()?;
                continue;
            }
        };

        match session.apply(action) {
            Ok(event) => {
                render_event(out, event)?;
                if let Some(now) = session.snapshot() {
                    render_state(out, &now)?;
                }
                if event.is_terminal() {
                    if session.is_complete() {
                        out.flush()?;
                        return Ok(PlayEnd::Completed);
                    }
                    writeln!(out, "   press Enter for the next balloon")?;
                }
            }
            Err(err) => {
                writeln!(out, "   {}", err.to_string().yellow())?;
                if snapshot.phase.is_terminal() {
                    writeln!(out, "   press Enter for the next balloon")?;
                }
            }
        }
        out.flush()?;
    }

    Ok(if session.is_complete() {
        PlayEnd::Completed
    } else {
        PlayEnd::Quit
    })
}
