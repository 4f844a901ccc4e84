use anyhow::{Context, Result, bail};
use markdown_composer_config::Config;
use markdown_composer_engine::{
    BlockFormat, Command, Session, SessionOptions, ToolbarAction, TransformerSet,
};
use std::{
    env, fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

const HELP: &str = "\
select <text>   select text within one block
pick <tag>      select a #hashtag or [[keyword]] as a whole
type <text>     replace the selection with text
bold | italic   toggle a format on the selection
link <url>      link the selection (or unlink when on a link)
bullet | number toggle a list
heading | normal
undo | redo | clear
readonly | editable
state           print the toolbar state as JSON
show            print the document as markdown
help | quit";

/// One line of input from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Action(ToolbarAction),
    Select(String),
    Pick(String),
    Type(String),
    Clear,
    Editable(bool),
    State,
    Show,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let needs_arg = |what: &str| -> Result<String> {
        if rest.is_empty() {
            bail!("{word} needs {what}");
        }
        Ok(rest.to_string())
    };

    let input = match word {
        "select" => Input::Select(needs_arg("some text")?),
        "pick" => Input::Pick(needs_arg("a hashtag or keyword")?),
        "type" => Input::Type(needs_arg("some text")?),
        "bold" => Input::Action(ToolbarAction::ToggleBold),
        "italic" => Input::Action(ToolbarAction::ToggleItalic),
        "link" => Input::Action(ToolbarAction::ToggleLink(needs_arg("a url")?)),
        "unlink" => Input::Action(ToolbarAction::ToggleLink(String::new())),
        "bullet" => Input::Action(ToolbarAction::ToggleBulletedList),
        "number" => Input::Action(ToolbarAction::ToggleNumberedList),
        "heading" => Input::Action(ToolbarAction::FormatBlock(BlockFormat::Heading)),
        "normal" => Input::Action(ToolbarAction::FormatBlock(BlockFormat::Normal)),
        "undo" => Input::Action(ToolbarAction::Undo),
        "redo" => Input::Action(ToolbarAction::Redo),
        "clear" => Input::Clear,
        "readonly" => Input::Editable(false),
        "editable" => Input::Editable(true),
        "state" => Input::State,
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => bail!("unknown command: {other} (try help)"),
    };
    Ok(Some(input))
}

struct App {
    session: Session,
}

impl App {
    fn new(config: &Config, initial_markdown: String) -> Result<Self> {
        let transformers = match &config.markdown.transformers {
            Some(names) => TransformerSet::from_names(names)
                .context("Invalid [markdown] transformers in config")?,
            None => TransformerSet::default(),
        };
        let options = SessionOptions {
            initial_markdown,
            label: config.session.label.clone(),
            editable_by_default: config.session.editable_by_default,
            autofocus: config.session.autofocus,
            heading_level: config.markdown.heading_level,
            list_indent: config.markdown.list_indent,
            history_limit: config.history.limit,
            transformers,
            auto_link: config.session.auto_link,
            markdown_shortcuts: config.markdown.shortcuts,
            ..SessionOptions::default()
        };
        let export_path = config.output.export_path.clone();

        let session = Session::new(options, move |markdown, label| {
            match label {
                Some(label) => println!("--- {label} changed ---"),
                None => println!("--- changed ---"),
            }
            println!("{markdown}");
            if let Some(path) = &export_path
                && let Err(e) = write_export(path, markdown)
            {
                log::error!("Failed to write {}: {e:#}", path.display());
            }
        })?;
        Ok(Self { session })
    }

    /// Run one input; returns `false` when the user asked to quit.
    fn handle(&mut self, input: Input) -> Result<bool> {
        match input {
            Input::Action(ToolbarAction::ToggleLink(url))
                if url.is_empty() && !self.session.toolbar_state().is_link =>
            {
                println!("selection is not on a link");
            }
            Input::Action(action) => {
                if !self.session.perform(action.clone())? {
                    println!("{action:?}: nothing to do");
                }
            }
            Input::Select(text) => {
                if !self.session.select_text(&text)? {
                    println!("not found: {text}");
                }
            }
            Input::Pick(atom) => {
                let needle = atom.trim_start_matches("[[").trim_end_matches("]]");
                if !self.session.select_atom(needle)? {
                    println!("no hashtag or keyword: {atom}");
                }
            }
            Input::Type(text) => {
                if !self.session.dispatch(Command::InsertText(text))? {
                    println!("cannot type here");
                }
            }
            Input::Clear => {
                self.session.dispatch(Command::ClearEditor)?;
            }
            Input::Editable(editable) => {
                self.session.set_editable(editable);
            }
            Input::State => {
                println!("{}", serde_json::to_string_pretty(&self.session.toolbar_state())?);
            }
            Input::Show => println!("{}", self.session.markdown()),
            Input::Help => println!("{HELP}"),
            Input::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn write_export(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{markdown}\n"))?;
    Ok(())
}

fn run_app(app: &mut App, input: impl BufRead) -> Result<()> {
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;
    for line in input.lines() {
        let line = line?;
        match parse_input(&line) {
            Ok(Some(input)) => match app.handle(input) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => println!("error: {e:#}"),
            },
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
        print!("> ");
        stdout.flush()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = Config::config_path();
    log::info!("Config path: {}", config_path.display());
    let config = match Config::load()? {
        Some(config) => config,
        None => {
            log::info!("No config file, using defaults");
            Config::default()
        }
    };

    let args: Vec<String> = env::args().collect();
    let initial_markdown = match args.as_slice() {
        [_] => String::new(),
        [_, file] => {
            let file = PathBuf::from(file);
            fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?
        }
        _ => {
            eprintln!("Usage: {} [markdown-file]", args[0]);
            std::process::exit(1);
        }
    };

    let mut app = App::new(&config, initial_markdown)?;
    println!("{}", app.session.markdown());
    run_app(&mut app, io::stdin().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("bold", Input::Action(ToolbarAction::ToggleBold))]
    #[case("  heading  ", Input::Action(ToolbarAction::FormatBlock(BlockFormat::Heading)))]
    #[case("link https://a.b", Input::Action(ToolbarAction::ToggleLink("https://a.b".into())))]
    #[case("select two words", Input::Select("two words".into()))]
    #[case("pick #todo", Input::Pick("#todo".into()))]
    #[case("readonly", Input::Editable(false))]
    #[case("q", Input::Quit)]
    fn test_parse_input(#[case] line: &str, #[case] expected: Input) {
        assert_eq!(parse_input(line).unwrap(), Some(expected));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse_input("   ").unwrap(), None);
    }

    #[rstest]
    #[case("select")]
    #[case("link")]
    #[case("pick")]
    #[case("frobnicate")]
    fn test_bad_input_is_rejected(#[case] line: &str) {
        assert!(parse_input(line).is_err());
    }

    #[test]
    fn test_app_types_over_picked_keyword() {
        let mut app = App::new(&Config::default(), "see [[later]] ok".into()).unwrap();
        assert!(app.handle(Input::Pick("[[later]]".into())).unwrap());
        assert!(app.handle(Input::Type("now".into())).unwrap());
        assert_eq!(app.session.markdown(), "see now ok");
    }

    #[test]
    fn test_app_applies_actions() {
        let mut app = App::new(&Config::default(), "make it bold".into()).unwrap();
        assert!(app.handle(Input::Select("bold".into())).unwrap());
        assert!(app.handle(Input::Action(ToolbarAction::ToggleBold)).unwrap());
        assert_eq!(app.session.markdown(), "make it **bold**");
        assert!(!app.handle(Input::Quit).unwrap());
    }

    #[test]
    fn test_config_transformers_are_validated() {
        let mut config = Config::default();
        config.markdown.transformers = Some(vec!["link".into(), "heading".into()]);
        assert!(App::new(&config, String::new()).is_err());
    }

    #[test]
    fn test_changes_are_written_to_export_path() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out").join("notes.md");
        let mut config = Config::default();
        config.output.export_path = Some(out.clone());

        let mut app = App::new(&config, "item".into()).unwrap();
        app.handle(Input::Select("item".into())).unwrap();
        app.handle(Input::Action(ToolbarAction::ToggleBulletedList))
            .unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "- item\n");
    }

    #[test]
    fn test_run_app_stops_at_quit() {
        let mut app = App::new(&Config::default(), "x".into()).unwrap();
        run_app(&mut app, "select x\nitalic\nquit\nbold\n".as_bytes()).unwrap();
        assert_eq!(app.session.markdown(), "*x*");
    }
}
