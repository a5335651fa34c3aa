//! Behaviour-driven step definitions driving the import CLI scenarios.

use super::helpers::Workspace;
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Import CLI scenario state, so each step only needs a single world argument.
struct ImportWorld {
    workspace: Workspace,
    elements: RefCell<Option<Utf8PathBuf>>,
    cli_args: RefCell<Vec<String>>,
    cli_result: RefCell<Option<Result<ImportConfig, CliError>>>,
}

impl ImportWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            elements: RefCell::new(None),
            cli_args: RefCell::new(Vec::new()),
            cli_result: RefCell::new(None),
        }
    }

    fn elements(&self) -> Utf8PathBuf {
        self.elements
            .borrow()
            .clone()
            .expect("element file should be written")
    }

    fn output(&self) -> Utf8PathBuf {
        self.workspace.path("rows.db")
    }

    fn config(&self) -> ImportConfig {
        self.cli_result
            .borrow()
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect("expected success")
            .clone()
    }
}

#[fixture]
fn world() -> ImportWorld {
    ImportWorld::new()
}

#[given("an element file exists on disk")]
fn element_file_exists(#[from(world)] world: &ImportWorld) {
    let path = world.workspace.write_elements();
    assert!(path.exists(), "expected the element file to exist on disk");
    *world.elements.borrow_mut() = Some(path);
}

#[given("I pass the element and output paths with CLI flags")]
fn cli_provides_paths(#[from(world)] world: &ImportWorld) {
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_ELEMENTS}"),
        world.elements().into_string(),
        format!("--{ARG_OUTPUT}"),
        world.output().into_string(),
    ]);
}

#[given("I pass only the elements CLI flag")]
fn cli_only_elements(#[from(world)] world: &ImportWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_ELEMENTS}"), world.elements().into_string()]);
}

#[given("I select the \"union\" ring strategy")]
fn cli_selects_union(#[from(world)] world: &ImportWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend(["--strategy".to_owned(), "union".to_owned()]);
}

#[when("I configure the import command")]
fn configure_import(#[from(world)] world: &ImportWorld) {
    let mut invocation = vec!["trekmap".to_owned(), "import".to_owned()];
    invocation.extend(world.cli_args.borrow().iter().cloned());
    let outcome = Cli::try_parse_from(invocation)
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| match cli.command {
            Command::Import(args) => args.into_config(),
        });
    world.cli_result.replace(Some(outcome));
}

#[then("the import plan uses the CLI-provided paths")]
fn plan_uses_cli_paths(#[from(world)] world: &ImportWorld) {
    let config = world.config();
    assert_eq!(config.elements, world.elements());
    assert_eq!(config.output, world.output());
    assert_eq!(config.prefix, DEFAULT_TABLE_PREFIX);
}

#[then("the CLI reports that the \"output\" flag is missing")]
fn reports_missing_output(#[from(world)] world: &ImportWorld) {
    let borrowed = world.cli_result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_OUTPUT),
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("relations are assembled with the union strategy")]
fn union_strategy_selected(#[from(world)] world: &ImportWorld) {
    assert_eq!(world.config().engine.assembly.strategy, RingStrategy::Union);
}

macro_rules! register_import_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/import_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ImportWorld) {
            let _ = world;
        }
    };
}

register_import_scenario!(cli_flag_selection, "selecting inputs via CLI flags");
register_import_scenario!(rejecting_missing_output, "rejecting a missing output flag");
register_import_scenario!(union_strategy, "choosing the union ring strategy");
