use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the cabinet binary.
#[derive(Parser, Debug)]
#[command(
    name = "cabinet",
    version,
    about = "Resolve a module specifier to the file it refers to"
)]
pub struct CliArgs {
    /// The specifier as written in the import, e.g. `./util` or `lodash`.
    #[arg(required_unless_present = "list_extensions")]
    pub specifier: Option<String>,

    /// File that contains the import.
    #[arg(short = 'f', long, required_unless_present = "list_extensions")]
    pub filename: Option<PathBuf>,

    /// Project root used for package and webpack lookups. Defaults to the
    /// current directory.
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// tsconfig.json path, or an inline JSON object.
    #[arg(long = "ts-config", alias = "tsConfig")]
    pub ts_config: Option<String>,

    /// webpack config (JSON) whose `resolve` section drives lookups.
    #[arg(long = "webpack-config", alias = "webpackConfig")]
    pub webpack_config: Option<PathBuf>,

    /// RequireJS config file.
    #[arg(long = "amd-config", alias = "amdConfig")]
    pub amd_config: Option<PathBuf>,

    /// package.json field preferred over `main`, e.g. `module`.
    #[arg(long = "node-module-entry", alias = "nodeModulesConfig")]
    pub node_module_entry: Option<String>,

    /// Prefer implementation files over `.d.ts` declarations.
    #[arg(long = "no-type-definitions", alias = "noTypeDefinitions")]
    pub no_type_definitions: bool,

    /// Extra extension to match resolvers against (repeatable).
    #[arg(short = 'e', long = "extension")]
    pub extensions: Vec<String>,

    /// Print the extensions with a registered resolver and exit.
    #[arg(long = "list-extensions")]
    pub list_extensions: bool,
}
