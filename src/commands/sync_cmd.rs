//! Commands that talk to the whiteboard server.

use std::io::{self, Write};

use super::{has_unsynced_changes, Workspace};
use whiteboard::storage::DeleteOutcome;
use whiteboard::sync::{SaveResult, Strategy};

/// Saves the working copy to the server, merging if the server moved on.
pub async fn save(
    workspace: &Workspace,
    strategy: Strategy,
) -> Result<(), Box<dyn std::error::Error>> {
    let local = workspace.local.load().await?;

    println!("Saving board '{}'...", workspace.board_id());
    let result = workspace.remote.save_with(&local, strategy).await?;
    workspace.local.store(&result.document).await?;

    print_save_result(&result, strategy);
    Ok(())
}

pub(super) fn print_save_result(result: &SaveResult, strategy: Strategy) {
    match result.remote_version {
        None => {
            println!("  ! version check failed, saved without conflict detection");
        }
        Some(remote) if result.merged => {
            println!(
                "  Server was at v{}, resolved with {} strategy",
                remote, strategy
            );
            for conflict in &result.conflicts {
                println!("    - {}: {}", conflict.kind(), conflict.message());
            }
        }
        Some(_) => {}
    }
    println!("✓ saved as v{}", result.version());
}

pub async fn status(workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let local = workspace.local.load().await?;

    println!("Board Status");
    println!("============");
    println!();
    println!("Board:         {}", workspace.board_id());
    println!("Local version: v{}", local.version);
    println!(
        "Local edits:   {}",
        if has_unsynced_changes(&local) {
            "unsaved"
        } else {
            "none"
        }
    );
    println!();

    print!("Server: ");
    let check = workspace.remote.check(local.version).await;
    match (check.remote_version, check.error) {
        (_, Some(e)) => println!("✗ unreachable ({})", e),
        (Some(remote), None) if check.has_conflict => {
            println!("⚠ ahead at v{}", remote);
            println!();
            println!("Run `whiteboard save` to merge, or `whiteboard pull --force` to discard local edits.");
        }
        (Some(remote), None) => println!("✓ v{}, up to date", remote),
        (None, None) => println!("✓ up to date"),
    }
    Ok(())
}

/// Replaces the working copy with the server's board.
pub async fn pull(workspace: &Workspace, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let local = workspace.local.load().await?;
    if !force && has_unsynced_changes(&local) {
        return Err(
            "Local copy has unsaved changes. Run `whiteboard save` first or pass --force to discard them."
                .into(),
        );
    }

    let remote = workspace.remote.load().await?;
    workspace.local.store(&remote).await?;

    println!(
        "Pulled board '{}' v{} ({} notes, {} sections)",
        workspace.board_id(),
        remote.version,
        remote.notes.len(),
        remote.sections.len()
    );
    Ok(())
}

/// Deletes the board on the server and the local working copy.
pub async fn delete_board(
    workspace: &Workspace,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Confirm deletion unless --force is used
    if !force {
        print!(
            "Delete board '{}' on the server and locally? [y/N] ",
            workspace.board_id()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    match workspace.remote.delete_board().await? {
        DeleteOutcome::Deleted => println!("Deleted board '{}' on server", workspace.board_id()),
        DeleteOutcome::NotFound => println!("Board '{}' not found on server", workspace.board_id()),
    }
    workspace.local.delete().await?;
    Ok(())
}
