use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run_undo(app: &mut App, format: &OutputFormat) -> Result<()> {
    let undone = app.open.undo();
    if undone.is_some() {
        app.save()?;
    }
    report("undo", undone, app.open.history().peek_undo(), format)
}

pub fn run_redo(app: &mut App, format: &OutputFormat) -> Result<()> {
    let redone = app.open.redo();
    if redone.is_some() {
        app.save()?;
    }
    report("redo", redone, app.open.history().peek_redo(), format)
}

fn report(
    action: &str,
    description: Option<String>,
    next: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "action": action,
                "applied": description,
                "next": next,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match description {
            Some(description) => {
                let verb = if action == "undo" { "Undid" } else { "Redid" };
                println!("{}: {}", verb, description);
            }
            None => println!("Nothing to {}", action),
        },
    }
    Ok(())
}
