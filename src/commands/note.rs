use clap::{Args, Subcommand};

use super::{truncate, OutputFormat, Workspace};
use whiteboard::models::{NewNote, NoteUpdate};

#[derive(Args)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub command: NoteSubcommand,
}

#[derive(Subcommand)]
pub enum NoteSubcommand {
    /// Add a sticky note
    Add {
        /// Note text (default: "New note")
        content: Option<String>,

        /// Background color, e.g. "#ffeb3b"
        #[arg(long)]
        color: Option<String>,

        /// Distance from the top edge
        #[arg(long)]
        top: Option<f64>,

        /// Distance from the left edge
        #[arg(long)]
        left: Option<f64>,

        /// Place the note inside a section
        #[arg(long)]
        section: Option<u64>,
    },

    /// List notes
    List {
        /// Only notes inside this section
        #[arg(long)]
        section: Option<u64>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a note
    Edit {
        /// Note ID
        id: u64,

        /// New text
        #[arg(long)]
        content: Option<String>,

        /// New color
        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        top: Option<f64>,

        #[arg(long)]
        left: Option<f64>,

        /// Move into a section
        #[arg(long, conflicts_with = "detach")]
        section: Option<u64>,

        /// Take the note out of its section
        #[arg(long)]
        detach: bool,
    },

    /// Delete a note
    Rm {
        /// Note ID
        id: u64,
    },
}

impl NoteCommand {
    pub async fn run(&self, workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = workspace.load_store().await?;

        match &self.command {
            NoteSubcommand::Add {
                content,
                color,
                top,
                left,
                section,
            } => {
                if let Some(section_id) = section {
                    if store.document().section(*section_id).is_none() {
                        return Err(format!("Section not found: {}", section_id).into());
                    }
                }

                let note = store.create_note(NewNote {
                    content: content.clone(),
                    color: color.clone(),
                    top: *top,
                    left: *left,
                    section_id: *section,
                });
                workspace.commit(&store).await?;

                println!("Added note:");
                println!("  {}", note);
                Ok(())
            }

            NoteSubcommand::List { section, format } => {
                let notes: Vec<_> = match section {
                    Some(section_id) => store.notes_in_section(*section_id),
                    None => store.notes().iter().collect(),
                };

                if notes.is_empty() {
                    println!("No notes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&notes)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<5}  {:<30}  {:<8}  {:<14}  SECTION",
                            "ID", "CONTENT", "COLOR", "POSITION"
                        );
                        println!("{}", "-".repeat(72));
                        for note in &notes {
                            let position = format!("({}, {})", note.top, note.left);
                            let section = note
                                .section_id
                                .map(|id| id.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<5}  {:<30}  {:<8}  {:<14}  {}",
                                note.id,
                                truncate(&note.content, 30),
                                note.color,
                                position,
                                section
                            );
                        }
                        println!("\nTotal: {} note(s)", notes.len());
                    }
                }
                Ok(())
            }

            NoteSubcommand::Edit {
                id,
                content,
                color,
                top,
                left,
                section,
                detach,
            } => {
                let section_id = if *detach {
                    Some(None)
                } else {
                    section.map(Some)
                };
                let update = NoteUpdate {
                    content: content.clone(),
                    color: color.clone(),
                    top: *top,
                    left: *left,
                    section_id,
                };

                if update.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }
                if let Some(Some(target)) = update.section_id {
                    if store.document().section(target).is_none() {
                        return Err(format!("Section not found: {}", target).into());
                    }
                }
                if !store.update_note(*id, &update) {
                    return Err(format!("Note not found: {}", id).into());
                }
                workspace.commit(&store).await?;

                if let Some(note) = store.document().note(*id) {
                    println!("Updated note:");
                    println!("  {}", note);
                }
                Ok(())
            }

            NoteSubcommand::Rm { id } => {
                if !store.delete_note(*id) {
                    return Err(format!("Note not found: {}", id).into());
                }
                workspace.commit(&store).await?;
                println!("Deleted note #{}", id);
                Ok(())
            }
        }
    }
}
