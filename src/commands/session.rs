//! Interactive editing session with auto-save.
//!
//! Reads one command per line from stdin. Edits go to an in-memory store;
//! the auto-saver pushes them to the server after a quiet period and on a
//! fixed interval, and every landed save refreshes the local working copy.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast::error::RecvError, Mutex};

use super::{has_unsynced_changes, Workspace};
use whiteboard::config::Config;
use whiteboard::models::{NewNote, NewSection, NoteUpdate};
use whiteboard::store::DocumentStore;
use whiteboard::sync::{AutoSaver, SaveEvent, SaveOutcome, SharedStore};

const HELP: &str = "\
Commands:
  add <text>               add a note
  edit <id> <text>         change a note's text
  move <id> <top> <left>   move a note
  color <id> <color>       recolor a note
  rm <id>                  delete a note
  section <title>          add a section
  rmsection <id>           delete a section and its notes
  list                     show the board
  save                     save now
  help                     show this help
  quit                     save pending edits and exit";

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Add(String),
    Edit(u64, String),
    Move(u64, f64, f64),
    Color(u64, String),
    Remove(u64),
    AddSection(String),
    RemoveSection(u64),
    List,
    Save,
    Help,
    Quit,
}

fn parse_id(word: Option<&str>) -> Result<u64, String> {
    let word = word.ok_or("missing id")?;
    word.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("invalid id '{}'", word))
}

fn parse_number(word: Option<&str>) -> Result<f64, String> {
    let word = word.ok_or("missing coordinate")?;
    word.parse()
        .map_err(|_| format!("invalid coordinate '{}'", word))
}

fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let mut words = rest.split_whitespace();

    let command = match verb {
        "add" => SessionCommand::Add(rest.to_string()),
        "edit" => {
            let id = parse_id(words.next())?;
            let text = rest
                .split_once(' ')
                .map(|(_, text)| text.trim().to_string())
                .unwrap_or_default();
            if text.is_empty() {
                return Err("missing text".to_string());
            }
            SessionCommand::Edit(id, text)
        }
        "move" => {
            let id = parse_id(words.next())?;
            let top = parse_number(words.next())?;
            let left = parse_number(words.next())?;
            SessionCommand::Move(id, top, left)
        }
        "color" => {
            let id = parse_id(words.next())?;
            let color = words.next().ok_or("missing color")?;
            SessionCommand::Color(id, color.to_string())
        }
        "rm" => SessionCommand::Remove(parse_id(words.next())?),
        "section" => SessionCommand::AddSection(rest.to_string()),
        "rmsection" => SessionCommand::RemoveSection(parse_id(words.next())?),
        "list" | "ls" => SessionCommand::List,
        "save" => SessionCommand::Save,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

/// Applies an editing command and returns the line to print.
fn apply(store: &mut DocumentStore, command: SessionCommand) -> String {
    let text_or_default = |text: String| if text.is_empty() { None } else { Some(text) };

    match command {
        SessionCommand::Add(text) => {
            let note = store.create_note(NewNote {
                content: text_or_default(text),
                ..Default::default()
            });
            format!("added {}", note)
        }
        SessionCommand::Edit(id, text) => update_note(
            store,
            id,
            NoteUpdate {
                content: Some(text),
                ..Default::default()
            },
        ),
        SessionCommand::Move(id, top, left) => update_note(
            store,
            id,
            NoteUpdate {
                top: Some(top),
                left: Some(left),
                ..Default::default()
            },
        ),
        SessionCommand::Color(id, color) => update_note(
            store,
            id,
            NoteUpdate {
                color: Some(color),
                ..Default::default()
            },
        ),
        SessionCommand::Remove(id) => {
            if store.delete_note(id) {
                format!("deleted note #{}", id)
            } else {
                format!("note #{} not found", id)
            }
        }
        SessionCommand::AddSection(title) => {
            let section = store.create_section(NewSection {
                title: text_or_default(title),
                ..Default::default()
            });
            format!("added {}", section)
        }
        SessionCommand::RemoveSection(id) => {
            let inside = store.notes_in_section(id).len();
            if store.delete_section(id) {
                format!("deleted section #{} and {} note(s)", id, inside)
            } else {
                format!("section #{} not found", id)
            }
        }
        SessionCommand::List => {
            let mut lines = Vec::new();
            for section in store.sections() {
                lines.push(section.to_string());
                for note in store.notes_in_section(section.id) {
                    lines.push(format!("  {}", note));
                }
            }
            for note in store.standalone_notes() {
                lines.push(note.to_string());
            }
            if lines.is_empty() {
                "board is empty".to_string()
            } else {
                lines.join("\n")
            }
        }
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Save | SessionCommand::Quit => String::new(),
    }
}

fn update_note(store: &mut DocumentStore, id: u64, update: NoteUpdate) -> String {
    if !store.update_note(id, &update) {
        return format!("note #{} not found", id);
    }
    match store.document().note(id) {
        Some(note) => format!("updated {}", note),
        None => format!("note #{} not found", id),
    }
}

pub async fn run(workspace: Workspace, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Arc::new(workspace);
    let initial = workspace.local.load().await?;
    let unsynced = has_unsynced_changes(&initial);

    let store: SharedStore = Arc::new(Mutex::new(DocumentStore::from_document(initial)));
    let mut saver = AutoSaver::start(
        store.clone(),
        workspace.remote.clone(),
        config.auto_save_config(),
    )
    .await;

    // Refresh the working copy after every save and report the outcome
    let mut events = saver.subscribe();
    let reporter = {
        let workspace = workspace.clone();
        let store = store.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SaveEvent::Saved { trigger, result }) => {
                        let store = store.lock().await;
                        if let Err(e) = workspace.commit(&store).await {
                            eprintln!("! failed to update local copy: {}", e);
                        }
                        let merged = if result.merged {
                            format!(", merged {} conflict(s)", result.conflict_count())
                        } else {
                            String::new()
                        };
                        println!("[{} save] v{}{}", trigger, result.version(), merged);
                    }
                    Ok(SaveEvent::Failed { trigger, error }) => {
                        println!("[{} save] failed: {}", trigger, error);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    println!(
        "Editing board '{}' (v{}). Type 'help' for commands.",
        workspace.board_id(),
        store.lock().await.version()
    );
    if unsynced {
        println!("Local copy has unsaved edits, saving shortly");
        store.lock().await.mark_dirty();
        saver.trigger();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Save => match saver.save_now().await {
                Ok(SaveOutcome::Saved(_)) => {}
                Ok(SaveOutcome::Clean) => println!("nothing to save"),
                Ok(SaveOutcome::Busy) => println!("save in progress, will retry"),
                Err(e) => println!("error: {}", e),
            },
            command => {
                let output = apply(&mut *store.lock().await, command);
                println!("{}", output);
            }
        }
    }

    // Let a running save land, then flush what it missed
    saver.stop().await;
    if store.lock().await.is_dirty() {
        println!("Saving pending edits...");
        loop {
            match saver.save_now().await {
                Ok(SaveOutcome::Busy) => {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await
                }
                Ok(_) => break,
                Err(e) => {
                    eprintln!("! final save failed, edits kept locally: {}", e);
                    break;
                }
            }
        }
    }

    // Closing the event channel lets the reporter print the last outcome
    drop(saver);
    let _ = reporter.await;

    workspace.commit(&*store.lock().await).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("add buy milk").unwrap(),
            Some(SessionCommand::Add("buy milk".into()))
        );
        assert_eq!(
            parse_command("edit #3 call Bob back").unwrap(),
            Some(SessionCommand::Edit(3, "call Bob back".into()))
        );
        assert_eq!(
            parse_command("move 2 120 40.5").unwrap(),
            Some(SessionCommand::Move(2, 120.0, 40.5))
        );
        assert_eq!(
            parse_command("color 1 #ff0000").unwrap(),
            Some(SessionCommand::Color(1, "#ff0000".into()))
        );
        assert_eq!(parse_command("rmsection 4").unwrap(), Some(SessionCommand::RemoveSection(4)));
        assert_eq!(parse_command("  ").unwrap(), None);
        assert_eq!(parse_command("exit").unwrap(), Some(SessionCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("rm").unwrap_err().contains("missing id"));
        assert!(parse_command("rm abc").unwrap_err().contains("invalid id"));
        assert!(parse_command("edit 3").unwrap_err().contains("missing text"));
        assert!(parse_command("move 1 10").unwrap_err().contains("missing coordinate"));
        assert!(parse_command("dance").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn test_apply_edits_store() {
        let mut store = DocumentStore::new();

        let out = apply(&mut store, SessionCommand::AddSection("Inbox".into()));
        assert!(out.contains("Inbox"));
        let out = apply(&mut store, SessionCommand::Add(String::new()));
        assert!(out.contains("New note"));

        apply(&mut store, SessionCommand::Move(1, 10.0, 20.0));
        let note = store.document().note(1).unwrap();
        assert_eq!((note.top, note.left), (10.0, 20.0));

        assert_eq!(
            apply(&mut store, SessionCommand::Remove(9)),
            "note #9 not found"
        );
        assert_eq!(
            apply(&mut store, SessionCommand::RemoveSection(1)),
            "deleted section #1 and 0 note(s)"
        );
        assert!(store.is_dirty());
    }

    #[test]
    fn test_list_groups_by_section() {
        let mut store = DocumentStore::new();
        store.initialize_default_data();

        let listing = apply(&mut store, SessionCommand::List);
        assert!(listing.contains("To do"));
        assert!(listing.contains("Drag to move"));
    }
}
