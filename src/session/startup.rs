use super::SessionContext;
use crate::domain::{scan_images, ImageEntry, ScanOptions};
use crate::error::{Result, ShortlistError};
use crate::prompt::{Prompter, StartChoice};
use crate::resume::{ResumeRecord, ResumeStore};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// How the user asked to start
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub resume: bool,
    /// Whether questions can be asked on the console
    pub interactive: bool,
    pub scan: ScanOptions,
}

/// A session ready to run
#[derive(Debug)]
pub struct Startup {
    pub context: SessionContext,
    pub images: Vec<ImageEntry>,
    pub cursor: usize,
    pub resumed: bool,
}

/// Decides between a new and a resumed session, asking on `prompter` when
/// the command line left it open.
pub fn establish<R: BufRead, W: Write>(
    options: &StartupOptions,
    store: Option<&ResumeStore>,
    prompter: &mut Prompter<R, W>,
) -> Result<Startup> {
    if let Some(root) = &options.root {
        let output = match &options.output {
            Some(output) => output.clone(),
            None => prompter.ask_output_dir()?,
        };
        return new_session(root, &output, store, &options.scan);
    }

    if options.resume {
        return match resume_saved(store, &options.scan) {
            Ok(startup) => Ok(startup),
            Err(e) if options.interactive => {
                tracing::warn!("{}", e);
                prompter.say(&format!("{}; starting a new session", e))?;
                prompt_new(options, store, prompter)
            }
            Err(e) => Err(e),
        };
    }

    if !options.interactive {
        return Err(ShortlistError::Prompt(
            "no images directory given and input is not interactive".to_string(),
        ));
    }

    if let Some(record) = load_saved(store) {
        if prompter.choose_start(&record.images_root)? == StartChoice::Resume {
            match resume_record(record, store, &options.scan) {
                Ok(startup) => return Ok(startup),
                Err(e) => {
                    tracing::warn!("{}", e);
                    prompter.say(&format!("{}; starting a new session", e))?;
                }
            }
        }
    }

    prompt_new(options, store, prompter)
}

fn prompt_new<R: BufRead, W: Write>(
    options: &StartupOptions,
    store: Option<&ResumeStore>,
    prompter: &mut Prompter<R, W>,
) -> Result<Startup> {
    let root = prompter.ask_images_dir()?;
    let output = match &options.output {
        Some(output) => output.clone(),
        None => prompter.ask_output_dir()?,
    };
    new_session(&root, &output, store, &options.scan)
}

/// Corrupt records are logged and treated as absent
fn load_saved(store: Option<&ResumeStore>) -> Option<ResumeRecord> {
    match store?.load() {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

fn resume_saved(store: Option<&ResumeStore>, scan: &ScanOptions) -> Result<Startup> {
    let Some(store) = store else {
        return Err(ShortlistError::ResumeUnavailable(
            "no state directory".to_string(),
        ));
    };
    let record = store.load()?.ok_or_else(|| {
        ShortlistError::ResumeUnavailable("no saved session".to_string())
    })?;
    resume_record(record, Some(store), scan)
}

fn resume_record(
    record: ResumeRecord,
    store: Option<&ResumeStore>,
    scan: &ScanOptions,
) -> Result<Startup> {
    // The saved position indexes the list as it was scanned back then
    let scan = ScanOptions {
        skip_hidden: record.skip_hidden,
        ..scan.clone()
    };
    let images = scan_images(&record.images_root, &scan)
        .map_err(|e| ShortlistError::ResumeUnavailable(e.to_string()))?;
    if images.is_empty() {
        return Err(ShortlistError::ResumeUnavailable(format!(
            "no images left in {}",
            record.images_root.display()
        )));
    }

    if images.len() != record.total_images {
        tracing::warn!(
            "{} changed since last session: {} images, was {}",
            record.images_root.display(),
            images.len(),
            record.total_images
        );
    }
    let cursor = record
        .current_image
        .as_ref()
        .and_then(|path| images.iter().position(|image| &image.path == path))
        .unwrap_or_else(|| record.current_index.min(images.len() - 1));
    let output_dir = prepare_output(&record.output_dir)?;

    tracing::info!(
        "resuming {} at {}/{}",
        record.images_root.display(),
        cursor + 1,
        images.len()
    );

    Ok(Startup {
        context: SessionContext {
            images_root: record.images_root,
            output_dir,
            store: store.cloned(),
            skip_hidden: record.skip_hidden,
        },
        images,
        cursor,
        resumed: true,
    })
}

fn new_session(
    root: &Path,
    output: &Path,
    store: Option<&ResumeStore>,
    scan: &ScanOptions,
) -> Result<Startup> {
    let images_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let images = scan_images(&images_root, scan)?;
    if images.is_empty() {
        return Err(ShortlistError::NoImages { root: images_root });
    }

    let output_dir = prepare_output(output)?;

    if let Some(store) = store {
        let mut record = ResumeRecord::new(&images_root, &output_dir, 0, images.len());
        record.current_image = Some(images[0].path.clone());
        record.skip_hidden = scan.skip_hidden;
        if let Err(e) = store.save(&record) {
            tracing::warn!("could not save new session: {}", e);
        }
    }

    Ok(Startup {
        context: SessionContext {
            images_root,
            output_dir,
            store: store.cloned(),
            skip_hidden: scan.skip_hidden,
        },
        images,
        cursor: 0,
        resumed: false,
    })
}

/// Creates the output directory if needed and returns its absolute path
fn prepare_output(path: &Path) -> Result<PathBuf> {
    let to_error = |e: std::io::Error| ShortlistError::OutputDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    fs::create_dir_all(path).map_err(to_error)?;
    fs::canonicalize(path).map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    type TestPrompter = Prompter<Cursor<Vec<u8>>, Vec<u8>>;

    struct Env {
        dir: TempDir,
        store: ResumeStore,
    }

    impl Env {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = ResumeStore::for_session(&dir.path().join("state"), "default");
            Self { dir, store }
        }

        fn photos(&self, name: &str, count: usize) -> PathBuf {
            let root = self.dir.path().join(name);
            fs::create_dir_all(&root).unwrap();
            for i in 0..count {
                fs::write(root.join(format!("{:02}.jpg", i)), b"x").unwrap();
            }
            fs::canonicalize(root).unwrap()
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("picked")
        }
    }

    fn prompter(input: &str) -> TestPrompter {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn options() -> StartupOptions {
        StartupOptions {
            interactive: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_root_on_command_line_starts_new_session() {
        let env = Env::new();
        let root = env.photos("photos", 3);
        let opts = StartupOptions {
            root: Some(root.clone()),
            output: Some(env.output()),
            ..options()
        };

        let startup = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();

        assert!(!startup.resumed);
        assert_eq!(startup.cursor, 0);
        assert_eq!(startup.images.len(), 3);
        assert!(env.output().is_dir());

        let record = env.store.load().unwrap().unwrap();
        assert_eq!(record.images_root, root);
        assert_eq!(record.current_index, 0);
        assert_eq!(record.total_images, 3);
    }

    #[test]
    fn test_root_without_output_asks_for_it() {
        let env = Env::new();
        let root = env.photos("photos", 1);
        let opts = StartupOptions {
            root: Some(root),
            ..options()
        };
        let mut p = prompter(&format!("{}\n", env.output().display()));

        let startup = establish(&opts, Some(&env.store), &mut p).unwrap();
        assert_eq!(
            startup.context.output_dir,
            fs::canonicalize(env.output()).unwrap()
        );
    }

    #[test]
    fn test_resume_flag_restores_cursor() {
        let env = Env::new();
        let root = env.photos("photos", 5);
        env.store
            .save(&ResumeRecord::new(&root, env.output(), 3, 5))
            .unwrap();
        let opts = StartupOptions {
            resume: true,
            ..options()
        };

        let startup = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();

        assert!(startup.resumed);
        assert_eq!(startup.cursor, 3);
        assert_eq!(startup.context.images_root, root);
    }

    #[test]
    fn test_resume_clamps_when_tree_shrank() {
        let env = Env::new();
        let root = env.photos("photos", 2);
        env.store
            .save(&ResumeRecord::new(&root, env.output(), 9, 10))
            .unwrap();
        let opts = StartupOptions {
            resume: true,
            ..options()
        };

        let startup = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();
        assert_eq!(startup.cursor, 1);
    }

    #[test]
    fn test_resume_keeps_skip_hidden_of_saved_session() {
        let env = Env::new();
        let root = env.photos("photos", 3);
        let hidden = root.join(".cache");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("t1.jpg"), b"x").unwrap();
        fs::write(hidden.join("t2.jpg"), b"x").unwrap();

        let opts = StartupOptions {
            root: Some(root.clone()),
            output: Some(env.output()),
            scan: ScanOptions {
                skip_hidden: true,
                ..Default::default()
            },
            ..options()
        };
        let first = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();
        assert_eq!(first.images.len(), 3);

        let mut record = env.store.load().unwrap().unwrap();
        record.current_index = 2;
        record.current_image = Some(first.images[2].path.clone());
        env.store.save(&record).unwrap();

        let opts = StartupOptions {
            resume: true,
            ..options()
        };
        let resumed = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();

        assert_eq!(resumed.images.len(), 3);
        assert_eq!(resumed.images[resumed.cursor].name, "02.jpg");
        assert!(resumed.context.skip_hidden);
    }

    #[test]
    fn test_resume_finds_saved_image_after_tree_grew() {
        let env = Env::new();
        let root = env.photos("photos", 3);
        let mut record = ResumeRecord::new(&root, env.output(), 1, 3);
        record.current_image = Some(root.join("01.jpg"));
        env.store.save(&record).unwrap();

        // Sorts before everything already there
        fs::write(root.join("00a.jpg"), b"x").unwrap();

        let opts = StartupOptions {
            resume: true,
            ..options()
        };
        let startup = establish(&opts, Some(&env.store), &mut prompter("")).unwrap();

        assert_eq!(startup.images.len(), 4);
        assert_eq!(startup.cursor, 2);
        assert_eq!(startup.images[2].name, "01.jpg");
    }

    #[test]
    fn test_resume_without_record_non_interactive_fails() {
        let env = Env::new();
        let opts = StartupOptions {
            resume: true,
            interactive: false,
            ..Default::default()
        };

        let err = establish(&opts, Some(&env.store), &mut prompter("")).unwrap_err();
        assert!(matches!(err, ShortlistError::ResumeUnavailable(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_resume_corrupt_record_falls_back_to_prompt() {
        let env = Env::new();
        let root = env.photos("photos", 2);
        fs::create_dir_all(env.store.path().parent().unwrap()).unwrap();
        fs::write(env.store.path(), "garbage").unwrap();
        let opts = StartupOptions {
            resume: true,
            ..options()
        };
        let mut p = prompter(&format!(
            "{}\n{}\n",
            root.display(),
            env.output().display()
        ));

        let startup = establish(&opts, Some(&env.store), &mut p).unwrap();
        assert!(!startup.resumed);
        assert_eq!(startup.images.len(), 2);
    }

    #[test]
    fn test_resume_missing_root_falls_back_to_prompt() {
        let env = Env::new();
        let gone = env.dir.path().join("deleted");
        env.store
            .save(&ResumeRecord::new(&gone, env.output(), 1, 4))
            .unwrap();
        let root = env.photos("photos", 2);
        let mut p = prompter(&format!(
            "1\n{}\n{}\n",
            root.display(),
            env.output().display()
        ));

        let startup = establish(&options(), Some(&env.store), &mut p).unwrap();

        assert!(!startup.resumed);
        assert_eq!(startup.context.images_root, root);
        let transcript = String::from_utf8(p_output(p)).unwrap();
        assert!(transcript.contains("starting a new session"));
    }

    #[test]
    fn test_menu_resume_choice() {
        let env = Env::new();
        let root = env.photos("photos", 4);
        env.store
            .save(&ResumeRecord::new(&root, env.output(), 2, 4))
            .unwrap();

        let startup = establish(&options(), Some(&env.store), &mut prompter("1\n")).unwrap();
        assert!(startup.resumed);
        assert_eq!(startup.cursor, 2);
    }

    #[test]
    fn test_menu_new_choice_prompts_paths() {
        let env = Env::new();
        let old = env.photos("old", 4);
        env.store
            .save(&ResumeRecord::new(&old, env.output(), 2, 4))
            .unwrap();
        let fresh = env.photos("fresh", 1);
        let mut p = prompter(&format!(
            "2\n{}\n{}\n",
            fresh.display(),
            env.output().display()
        ));

        let startup = establish(&options(), Some(&env.store), &mut p).unwrap();

        assert!(!startup.resumed);
        assert_eq!(startup.context.images_root, fresh);
        assert_eq!(env.store.load().unwrap().unwrap().images_root, fresh);
    }

    #[test]
    fn test_no_record_goes_straight_to_paths() {
        let env = Env::new();
        let root = env.photos("photos", 1);
        let mut p = prompter(&format!(
            "{}\n{}\n",
            root.display(),
            env.output().display()
        ));

        let startup = establish(&options(), Some(&env.store), &mut p).unwrap();
        assert_eq!(startup.images.len(), 1);
        let transcript = String::from_utf8(p_output(p)).unwrap();
        assert!(!transcript.contains("Resume last operation"));
    }

    #[test]
    fn test_empty_directory_reports_no_images() {
        let env = Env::new();
        let root = env.photos("empty", 0);
        let opts = StartupOptions {
            root: Some(root),
            output: Some(env.output()),
            ..options()
        };

        let err = establish(&opts, Some(&env.store), &mut prompter("")).unwrap_err();
        assert!(matches!(err, ShortlistError::NoImages { .. }));
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_non_interactive_without_root_fails() {
        let env = Env::new();
        let opts = StartupOptions::default();

        let err = establish(&opts, Some(&env.store), &mut prompter("")).unwrap_err();
        assert!(matches!(err, ShortlistError::Prompt(_)));
    }

    #[test]
    fn test_unusable_output_dir() {
        let env = Env::new();
        let root = env.photos("photos", 1);
        let blocker = env.dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let opts = StartupOptions {
            root: Some(root),
            output: Some(blocker.join("sub")),
            ..options()
        };

        let err = establish(&opts, Some(&env.store), &mut prompter("")).unwrap_err();
        assert!(matches!(err, ShortlistError::OutputDir { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    fn p_output(p: TestPrompter) -> Vec<u8> {
        p.into_parts().1
    }
}
