use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{truncate, OutputFormat, Workspace};
use whiteboard::models::{NewSection, SectionUpdate};

#[derive(Args)]
pub struct SectionCommand {
    #[command(subcommand)]
    pub command: SectionSubcommand,
}

#[derive(Subcommand)]
pub enum SectionSubcommand {
    /// Add a section
    Add {
        /// Section title (default: "Section <id>")
        title: Option<String>,

        #[arg(long)]
        top: Option<f64>,

        #[arg(long)]
        left: Option<f64>,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,
    },

    /// List sections
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rename, move or resize a section
    Edit {
        /// Section ID
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        top: Option<f64>,

        #[arg(long)]
        left: Option<f64>,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,
    },

    /// Delete a section and every note inside it
    Rm {
        /// Section ID
        id: u64,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl SectionCommand {
    pub async fn run(&self, workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = workspace.load_store().await?;

        match &self.command {
            SectionSubcommand::Add {
                title,
                top,
                left,
                width,
                height,
            } => {
                if width.is_some_and(|w| w <= 0.0) || height.is_some_and(|h| h <= 0.0) {
                    return Err("Width and height must be positive".into());
                }

                let section = store.create_section(NewSection {
                    title: title.clone(),
                    top: *top,
                    left: *left,
                    width: *width,
                    height: *height,
                });
                workspace.commit(&store).await?;

                println!("Added section:");
                println!("  {}", section);
                Ok(())
            }

            SectionSubcommand::List { format } => {
                let sections = store.sections();

                if sections.is_empty() {
                    println!("No sections found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(sections)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<5}  {:<24}  {:<14}  {:<10}  NOTES",
                            "ID", "TITLE", "POSITION", "SIZE"
                        );
                        println!("{}", "-".repeat(68));
                        for section in sections {
                            let position = format!("({}, {})", section.top, section.left);
                            let size = format!("{}x{}", section.width, section.height);
                            println!(
                                "{:<5}  {:<24}  {:<14}  {:<10}  {}",
                                section.id,
                                truncate(&section.title, 24),
                                position,
                                size,
                                store.notes_in_section(section.id).len()
                            );
                        }
                        println!("\nTotal: {} section(s)", sections.len());
                    }
                }
                Ok(())
            }

            SectionSubcommand::Edit {
                id,
                title,
                top,
                left,
                width,
                height,
            } => {
                let update = SectionUpdate {
                    title: title.clone(),
                    top: *top,
                    left: *left,
                    width: *width,
                    height: *height,
                };

                if update.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }
                if !store.update_section(*id, &update) {
                    return Err(format!("Section not found: {}", id).into());
                }
                workspace.commit(&store).await?;

                if let Some(section) = store.document().section(*id) {
                    println!("Updated section:");
                    println!("  {}", section);
                }
                Ok(())
            }

            SectionSubcommand::Rm { id, force } => {
                let section = match store.document().section(*id) {
                    Some(s) => s.clone(),
                    None => return Err(format!("Section not found: {}", id).into()),
                };
                let inside = store.notes_in_section(*id).len();

                // Confirm deletion unless --force is used
                if !force && inside > 0 {
                    print!(
                        "Delete section '{}' and its {} note(s)? [y/N] ",
                        section.title, inside
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                store.delete_section(*id);
                workspace.commit(&store).await?;
                println!("Deleted section '{}' and {} note(s)", section.title, inside);
                Ok(())
            }
        }
    }
}
