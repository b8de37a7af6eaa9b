//! Whole-board commands on the local working copy.

use std::io::{self, Write};

use super::{has_unsynced_changes, OutputFormat, Workspace};
use whiteboard::store::DocumentStore;

pub async fn show(
    workspace: &Workspace,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = workspace.load_store().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", store.document().to_json()?);
        }
        OutputFormat::Text => print_board(workspace.board_id(), &store),
    }
    Ok(())
}

fn print_board(board_id: &str, store: &DocumentStore) {
    let doc = store.document();
    let title = format!("Board '{}' (v{})", board_id, doc.version);
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));

    if let Some(updated) = doc.last_updated {
        println!("Last edited: {}", updated.format("%Y-%m-%d %H:%M:%S"));
    }
    if has_unsynced_changes(doc) {
        println!("Unsaved changes: yes (run `whiteboard save`)");
    }
    println!();

    if doc.notes.is_empty() && doc.sections.is_empty() {
        println!("Board is empty. Run `whiteboard init` for a starter board.");
        return;
    }

    for section in store.sections() {
        println!("{}", section);
        let notes = store.notes_in_section(section.id);
        if notes.is_empty() {
            println!("  (no notes)");
        }
        for note in notes {
            println!("  {}", note);
        }
        println!();
    }

    let standalone = store.standalone_notes();
    if !standalone.is_empty() {
        println!("Unsectioned notes:");
        for note in standalone {
            println!("  {}", note);
        }
        println!();
    }

    println!(
        "Total: {} note(s), {} section(s)",
        doc.notes.len(),
        doc.sections.len()
    );
}

/// Replaces the board's entities with the starter layout.
pub async fn init(workspace: &Workspace, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = workspace.load_store().await?;

    if !force && !confirm_discard(&store, "Replace")? {
        println!("Init cancelled.");
        return Ok(());
    }

    store.initialize_default_data();
    workspace.commit(&store).await?;
    println!(
        "Initialized board '{}' with {} notes and {} sections",
        workspace.board_id(),
        store.notes().len(),
        store.sections().len()
    );
    Ok(())
}

pub async fn clear(workspace: &Workspace, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = workspace.load_store().await?;

    if !force && !confirm_discard(&store, "Clear")? {
        println!("Clear cancelled.");
        return Ok(());
    }

    store.clear_all();
    workspace.commit(&store).await?;
    println!("Cleared board '{}'", workspace.board_id());
    Ok(())
}

/// Asks before throwing away a non-empty board.
fn confirm_discard(store: &DocumentStore, verb: &str) -> io::Result<bool> {
    if store.notes().is_empty() && store.sections().is_empty() {
        return Ok(true);
    }

    print!(
        "{} {} note(s) and {} section(s)? [y/N] ",
        verb,
        store.notes().len(),
        store.sections().len()
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
