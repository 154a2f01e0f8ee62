use anyhow::{bail, Result};

use recall_lib::flashcards::algorithm::format_interval;
use recall_lib::flashcards::Card;

use crate::app::App;
use crate::OutputFormat;

/// First characters of an id, enough to type back in
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn card_json(card: &Card) -> serde_json::Value {
    serde_json::to_value(card).unwrap_or(serde_json::Value::Null)
}

pub fn run_add(app: &mut App, front: &str, back: &str, format: &OutputFormat) -> Result<()> {
    let card = app.open.add_card(front, back, app.today)?;
    app.save()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => {
            println!("Added card {}", short_id(&card.id));
            println!("  Front: {}", card.front);
            if !card.back.is_empty() {
                println!("  Back:  {}", card.back);
            }
        }
    }
    Ok(())
}

pub fn run_list(app: &App, due_only: bool, format: &OutputFormat) -> Result<()> {
    let cards: Vec<Card> = if due_only {
        app.open.deck().get_due_cards(app.today)
    } else {
        app.open.deck().cards().to_vec()
    };

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = cards.iter().map(card_json).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("(no cards)");
                return Ok(());
            }
            println!(
                "{:<8}  {:<10}  {:>8}  {:>4}  FRONT",
                "ID", "DUE", "INTERVAL", "EASE"
            );
            for card in &cards {
                let due = if card.is_due(app.today) {
                    "now".to_string()
                } else {
                    card.next_review.to_string()
                };
                println!(
                    "{:<8}  {:<10}  {:>8}  {:>4.2}  {}",
                    short_id(&card.id),
                    due,
                    format_interval(card.interval_days),
                    card.ease_factor,
                    card.front.lines().next().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

pub fn run_show(app: &App, id: &str, format: &OutputFormat) -> Result<()> {
    let card = app.find_card(id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => {
            println!("{}", card.front);
            println!("---");
            println!("{}", card.back);
            println!();
            println!("  ID:          {}", card.id);
            println!("  Next review: {}", card.next_review);
            println!("  Interval:    {}", format_interval(card.interval_days));
            println!("  Ease:        {:.2}", card.ease_factor);
            println!("  Reviews:     {}", card.review_count);
        }
    }
    Ok(())
}

pub fn run_edit(
    app: &mut App,
    id: &str,
    front: Option<&str>,
    back: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    if front.is_none() && back.is_none() {
        bail!("Nothing to change; pass --front and/or --back");
    }

    let card = app.find_card(id)?;
    let card = app.open.edit_card(&card.id, front, back)?;
    app.save()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("Updated card {}", short_id(&card.id)),
    }
    Ok(())
}

pub fn run_delete(app: &mut App, id: &str, format: &OutputFormat) -> Result<()> {
    let card = app.find_card(id)?;
    let removed = app.open.delete_card(&card.id)?;
    app.save()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&removed)?),
        OutputFormat::Plain => {
            println!("Deleted card {} \"{}\"", short_id(&removed.id), removed.front);
            println!("  (recall undo brings it back)");
        }
    }
    Ok(())
}
