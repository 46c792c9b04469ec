use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{Instrument, debug, info, info_span, warn};

use desk_cli::logging::redact_content;
use desk_cli::settings::Settings;
use desk_modes::catalog::names;
use desk_modes::{COMPOSER_CONTEXT, ComposerDraft, ComposerSession, default_registry};
use desk_persistence::{CheckpointStore, DraftId, FileBackend, Snapshot, StorageBackend, Trigger};

use crate::cli::{HistoryArgs, SaveArgs, ShowArgs};
use crate::output::{history_table, modes_table};

/// Checkpoint store and settings shared by the commands.
pub struct App {
    store: CheckpointStore,
    settings: Settings,
}

impl App {
    /// Open the file store at `store_root`, or at the configured root.
    pub fn open(settings: Settings, store_root: Option<PathBuf>) -> Result<Self> {
        let root = store_root.unwrap_or_else(|| settings.storage_root());
        let namespace = settings.namespace().context("resolve storage namespace")?;
        debug!(root = %root.display(), namespace = %namespace.as_str(), "Opening draft store");
        let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(root));
        let store = CheckpointStore::with_options(backend, namespace, settings.retention.policy());
        Ok(Self { store, settings })
    }
}

pub fn run_modes() -> Result<()> {
    println!("{}", modes_table(&default_registry()));
    Ok(())
}

pub async fn run_save(app: &App, args: &SaveArgs) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    let trigger = if args.auto {
        Trigger::Automatic
    } else {
        Trigger::Manual
    };
    let draft_id = save_text(app, &text, args.draft, &args.context, trigger).await?;
    println!("{draft_id}");
    Ok(())
}

/// Store `text` as a composer draft body and return the draft id.
pub async fn save_text(
    app: &App,
    text: &str,
    draft: Option<DraftId>,
    context: &str,
    trigger: Trigger,
) -> Result<DraftId> {
    let snapshot = ComposerDraft {
        body: text.to_string(),
        ..ComposerDraft::default()
    }
    .snapshot()
    .context("encode draft")?;
    let draft_id = app
        .store
        .checkpoint(draft, trigger, snapshot, context)
        .await
        .context("store checkpoint")?;
    info!(draft = %draft_id, trigger = trigger.as_str(), "Checkpoint stored");
    Ok(draft_id)
}

pub async fn run_history(app: &App, args: &HistoryArgs) -> Result<()> {
    let entries = app
        .store
        .history(args.draft, &args.context)
        .await
        .with_context(|| format!("read history of draft {}", args.draft))?;
    println!("{}", history_table(&entries));
    Ok(())
}

pub async fn run_show(app: &App, args: &ShowArgs) -> Result<()> {
    let text = show_text(app, args).await?;
    println!("{text}");
    Ok(())
}

pub async fn show_text(app: &App, args: &ShowArgs) -> Result<String> {
    let checkpoint = match args.checkpoint {
        Some(checkpoint_id) => app.store.load(args.draft, &args.context, checkpoint_id).await,
        None => app.store.current(args.draft, &args.context).await,
    }
    .with_context(|| format!("load draft {}", args.draft))?;
    Ok(render_snapshot(&checkpoint.snapshot))
}

/// Body of a composer snapshot, or the raw text of anything else.
fn render_snapshot(snapshot: &Snapshot) -> String {
    match snapshot.decode::<ComposerDraft>() {
        Ok(draft) => draft.body,
        Err(_) => snapshot
            .as_text()
            .map_or_else(|| format!("<{} bytes of binary data>", snapshot.len()), str::to_string),
    }
}

pub async fn run_compose(app: &App, draft: Option<DraftId>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let span = info_span!("compose", draft = ?draft);
    match compose(app, draft, stdin).instrument(span).await? {
        Some(draft_id) => println!("{draft_id}"),
        None => eprintln!("Nothing to save."),
    }
    Ok(())
}

/// Feed `input` line by line into an autosaving composer.
///
/// Ends with a manual save. Returns `None` when a new draft stayed blank.
pub async fn compose<R>(app: &App, draft: Option<DraftId>, input: R) -> Result<Option<DraftId>>
where
    R: AsyncBufRead + Unpin,
{
    let registry = default_registry();
    if let Some(draft_id) = draft {
        let checkpoint = app
            .store
            .current(draft_id, COMPOSER_CONTEXT)
            .await
            .with_context(|| format!("load draft {draft_id}"))?;
        let restored = ComposerDraft::restore(draft_id, &checkpoint.snapshot)
            .context("decode stored draft")?;
        let active = registry.activate(names::COMMENT)?;
        active.state().replace(restored);
    }
    let session = ComposerSession::open(&registry, app.store.clone(), app.settings.autosave)?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("read input")? {
        debug!(line = redact_content(&line), "Appending line");
        session.edit(|draft| {
            if !draft.body.is_empty() {
                draft.body.push('\n');
            }
            draft.body.push_str(&line);
        })?;
    }

    let blank = session.draft().as_ref().is_none_or(ComposerDraft::is_blank);
    if blank && session.draft_id().is_none() {
        return Ok(None);
    }
    match session.save().await {
        Ok(draft_id) => Ok(Some(draft_id)),
        Err(e) => {
            warn!("{}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                warn!("{suggestion}");
            }
            Err(e).context("save draft")
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read stdin")?;
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use desk_persistence::CheckpointId;
    use tempfile::TempDir;

    use super::*;

    fn app(dir: &TempDir) -> App {
        App::open(Settings::default(), Some(dir.path().to_path_buf())).unwrap()
    }

    fn show_args(draft: DraftId, checkpoint: Option<CheckpointId>) -> ShowArgs {
        ShowArgs {
            draft,
            context: COMPOSER_CONTEXT.to_string(),
            checkpoint,
        }
    }

    #[tokio::test]
    async fn test_save_then_show() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let context = COMPOSER_CONTEXT;

        let draft = save_text(&app, "first", None, context, Trigger::Manual)
            .await
            .unwrap();
        let again = save_text(&app, "second", Some(draft), context, Trigger::Automatic)
            .await
            .unwrap();
        assert_eq!(again, draft);

        let entries = app.store.history(draft, context).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(show_text(&app, &show_args(draft, None)).await.unwrap(), "second");
        assert_eq!(
            show_text(&app, &show_args(draft, Some(entries[0].id)))
                .await
                .unwrap(),
            "first"
        );
    }

    #[tokio::test]
    async fn test_show_unknown_draft_fails() {
        let dir = TempDir::new().unwrap();
        let result = show_text(&app(&dir), &show_args(DraftId::new(), None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_compose_then_continue() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let draft = compose(&app, None, &b"gm\nnostr\n"[..])
            .await
            .unwrap()
            .unwrap();
        let again = compose(&app, Some(draft), &b"again\n"[..])
            .await
            .unwrap();
        assert_eq!(again, Some(draft));
        assert_eq!(
            show_text(&app, &show_args(draft, None)).await.unwrap(),
            "gm\nnostr\nagain"
        );
    }

    #[tokio::test]
    async fn test_compose_blank_input_saves_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(compose(&app(&dir), None, &b""[..]).await.unwrap(), None);
    }

    #[test]
    fn test_render_snapshot_falls_back_to_text() {
        assert_eq!(render_snapshot(&Snapshot::from_text("plain")), "plain");
        assert_eq!(
            render_snapshot(&Snapshot::from_bytes(vec![0xff, 0xfe])),
            "<2 bytes of binary data>"
        );
    }
}
