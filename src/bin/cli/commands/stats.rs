use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let deck = app.open.deck();
    let stats = deck.stats(app.today);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deck": deck.name(),
                "path": app.open.path().to_string_lossy(),
                "stats": stats,
                "undoSteps": app.open.history().undo_len(),
                "redoSteps": app.open.history().redo_len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{} ({})", deck.name(), app.open.path().display());
            println!("  Cards:        {}", stats.total_cards);
            println!("  New:          {}", stats.new_cards);
            println!("  Due today:    {}", stats.due_cards);
            println!("  Due tomorrow: {}", stats.due_tomorrow);
            println!("  Mature:       {}", stats.mature_cards);
            println!("  Reviews:      {}", stats.total_reviews);
            if stats.total_cards > 0 {
                println!("  Average ease: {:.2}", stats.average_ease);
            }
            if let Some(last) = app.open.history().peek_undo() {
                println!("  Last change:  {}", last);
            }
        }
    }
    Ok(())
}
