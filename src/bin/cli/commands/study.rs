use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use recall_lib::flashcards::algorithm::format_interval;
use recall_lib::flashcards::{Card, DeckError, Quality, RatingScale};
use recall_lib::session::{
    CheckpointSlot, PromptContext, ReviewPrompt, SessionOptions, SessionRunner, StopReason,
};

use crate::app::App;
use crate::OutputFormat;

/// Asks cards on the terminal, one line of input per step
struct TerminalPrompt<R> {
    input: R,
    scale: RatingScale,
}

impl<R: BufRead> TerminalPrompt<R> {
    /// `None` on end of input
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead> ReviewPrompt for TerminalPrompt<R> {
    fn review(&mut self, card: &Card, context: &PromptContext) -> io::Result<Option<Quality>> {
        let mut out = io::stdout();
        writeln!(out)?;
        writeln!(out, "[{}/{}] {}", context.position, context.total, card.front)?;
        write!(out, "(Enter to show the answer, q to stop) ")?;
        out.flush()?;

        match self.read_line()? {
            None => return Ok(None),
            Some(line) if line.eq_ignore_ascii_case("q") => return Ok(None),
            Some(_) => {}
        }

        writeln!(out, "{}", if card.back.is_empty() { "(no answer)" } else { card.back.as_str() })?;
        let [again, hard, good, easy] = context.preview.map(format_interval);
        writeln!(
            out,
            "again {} | hard {} | good {} | easy {}",
            again, hard, good, easy
        )?;

        loop {
            write!(out, "Rating ({}, q to stop): ", self.scale.hint())?;
            out.flush()?;

            let line = match self.read_line()? {
                None => return Ok(None),
                Some(line) => line,
            };
            if line.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match Quality::parse_on(&line, self.scale) {
                Ok(quality) => return Ok(Some(quality)),
                Err(DeckError::Validation(msg)) => writeln!(out, "{}", msg)?,
                Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            }
        }
    }
}

pub fn run(app: &mut App, limit: Option<usize>, shuffle: bool, format: &OutputFormat) -> Result<()> {
    let options = SessionOptions {
        limit: limit.or(app.config.session_limit),
        shuffle,
        checkpoint_every: app.config.checkpoint_every,
    };

    // On Ctrl-C, write the deck and history as of the last review and leave
    let interrupted = Arc::new(AtomicBool::new(false));
    let slot = CheckpointSlot::new();
    {
        let interrupted = interrupted.clone();
        let slot = slot.clone();
        let path = app.open.path().to_path_buf();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
            match slot.save_latest(&path) {
                Ok(true) => eprintln!("\nInterrupted; progress saved to {}", path.display()),
                Ok(false) => {}
                Err(e) => eprintln!("\nInterrupted; could not save progress: {}", e),
            }
            std::process::exit(130);
        })
        .context("Failed to install interrupt handler")?;
    }

    let stdin = io::stdin();
    let mut prompt = TerminalPrompt {
        input: stdin.lock(),
        scale: app.config.rating_scale,
    };

    let today = app.today;
    let path = app.open.path().to_path_buf();
    let summary = SessionRunner::new(&mut app.open, options)
        .with_interrupt(interrupted)
        .with_checkpoint_slot(slot)
        .run(&mut prompt, today)
        .with_context(|| {
            format!(
                "Session could not be saved to {}; the last checkpoint may be stale",
                path.display()
            )
        })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            println!();
            if summary.selected == 0 {
                println!("Nothing due today.");
                return Ok(());
            }
            let how = match summary.stopped {
                StopReason::Finished => "Done",
                StopReason::Quit => "Stopped",
                StopReason::Interrupted => "Interrupted",
            };
            println!(
                "{}: {} of {} cards reviewed (again {}, hard {}, good {}, easy {})",
                how,
                summary.reviewed,
                summary.selected,
                summary.again,
                summary.hard,
                summary.good,
                summary.easy
            );
            if summary.failed_checkpoints > 0 {
                println!(
                    "Warning: {} intermediate saves failed; the final save succeeded",
                    summary.failed_checkpoints
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn card() -> Card {
        Card::new(
            "capital of France".to_string(),
            "Paris".to_string(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    fn context() -> PromptContext {
        PromptContext {
            position: 1,
            total: 1,
            preview: [1, 3, 3, 3],
        }
    }

    fn prompt(input: &str, scale: RatingScale) -> TerminalPrompt<Cursor<Vec<u8>>> {
        TerminalPrompt {
            input: Cursor::new(input.as_bytes().to_vec()),
            scale,
        }
    }

    #[test]
    fn test_reprompts_until_valid() {
        let mut p = prompt("\n9\nsoon\n3\n", RatingScale::FourPoint);
        assert_eq!(p.review(&card(), &context()).unwrap(), Some(Quality::Good));
    }

    #[test]
    fn test_sm2_scale() {
        let mut p = prompt("\n1\n", RatingScale::Sm2);
        assert_eq!(p.review(&card(), &context()).unwrap(), Some(Quality::Again));
    }

    #[test]
    fn test_quit_and_end_of_input() {
        assert_eq!(prompt("q\n", RatingScale::FourPoint).review(&card(), &context()).unwrap(), None);
        assert_eq!(prompt("\nQ\n", RatingScale::FourPoint).review(&card(), &context()).unwrap(), None);
        assert_eq!(prompt("", RatingScale::FourPoint).review(&card(), &context()).unwrap(), None);
    }
}
