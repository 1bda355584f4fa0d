//! Assembly of toolchain invocations, one function per tool.
//!
//! Every path-valued parameter goes through the [`PathTranslator`] exactly
//! once and is emitted as a quoted argument. Nothing here checks that paths
//! exist or that the toolchain accepts the flags; the child's exit code is
//! the only validation.

use dotbridge_core::tools::{
    AddMigrationParams, AddPackageParams, BuildParams, CleanParams, CreateProjectParams,
    MigrationParams, PackageParams, ProjectParams, PublishParams, ReferenceParams, RunParams,
    RunTestsParams, UpdateDatabaseParams,
};
use dotbridge_core::{project_dir, CommandSpec, PathTranslator, ToolCall};
use std::path::{Path, PathBuf};

pub const DEFAULT_BUILD_CONFIGURATION: &str = "Release";
pub const DEFAULT_RUN_CONFIGURATION: &str = "Debug";

/// Appended to build/rebuild when warnings are suppressed
pub const SUPPRESS_WARNING_ARGS: [&str; 6] = [
    "--nologo",
    "-v",
    "q",
    "--property",
    "WarningLevel=0",
    "/clp:ErrorsOnly",
];

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    translator: PathTranslator,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, translator: PathTranslator) -> Self {
        Self {
            program: program.into(),
            translator,
        }
    }

    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }

    /// The invocation for `call`, or `None` for tools that do not shell out
    pub fn for_call(&self, call: &ToolCall) -> Option<CommandSpec> {
        let spec = match call {
            ToolCall::BuildProject(p) => self.build(p),
            ToolCall::RebuildProject(p) => self.rebuild(p),
            ToolCall::CleanProject(p) => self.clean(p),
            ToolCall::RunProject(p) => self.run(p),
            ToolCall::PublishProject(p) => self.publish(p),
            ToolCall::GetProjectInfo(_) => return None,
            ToolCall::AddPackage(p) => self.add_package(p),
            ToolCall::RemovePackage(p) => self.remove_package(p),
            ToolCall::ListPackages(p) => self.list_packages(p),
            ToolCall::RestorePackages(p) => self.restore(p),
            ToolCall::AddMigration(p) => self.add_migration(p),
            ToolCall::RemoveMigration(p) => self.remove_migration(p),
            ToolCall::ListMigrations(p) => self.list_migrations(p),
            ToolCall::UpdateDatabase(p) => self.update_database(p),
            ToolCall::CreateProject(p) => self.create_project(p),
            ToolCall::AddProjectReference(p) => self.add_reference(p),
            ToolCall::RemoveProjectReference(p) => self.remove_reference(p),
            ToolCall::ListProjectReferences(p) => self.list_references(p),
            ToolCall::RunTests(p) => self.test(p),
        };
        Some(spec)
    }

    pub fn build(&self, params: &BuildParams) -> CommandSpec {
        self.build_command(params, false)
    }

    /// There is no rebuild subcommand; a non-incremental build stands in for it
    pub fn rebuild(&self, params: &BuildParams) -> CommandSpec {
        self.build_command(params, true)
    }

    fn build_command(&self, params: &BuildParams, rebuild: bool) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self
            .base()
            .arg("build")
            .quoted(&project)
            .arg("--configuration")
            .arg(configuration(&params.configuration, DEFAULT_BUILD_CONFIGURATION));
        if rebuild {
            spec = spec.arg("--no-incremental");
        }
        if let Some(extra) = non_empty(&params.additional_args) {
            spec = spec.args(self.split_args(extra));
        }
        if params.suppress_warnings {
            spec = spec.args(SUPPRESS_WARNING_ARGS);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn clean(&self, params: &CleanParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        self.base()
            .arg("clean")
            .quoted(&project)
            .arg("--configuration")
            .arg(configuration(&params.configuration, DEFAULT_BUILD_CONFIGURATION))
            .cwd(working_dir(&project))
    }

    pub fn run(&self, params: &RunParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self
            .base()
            .arg("run")
            .arg("--project")
            .quoted(&project)
            .arg("--configuration")
            .arg(configuration(&params.configuration, DEFAULT_RUN_CONFIGURATION));
        if let Some(arguments) = non_empty(&params.arguments) {
            spec = spec.arg("--").args(self.split_args(arguments));
        }
        spec.cwd(working_dir(&project))
    }

    pub fn publish(&self, params: &PublishParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);
        let output = self.translate_optional(&params.output_path);

        let mut spec = self
            .base()
            .arg("publish")
            .quoted(&project)
            .arg("--configuration")
            .arg(configuration(&params.configuration, DEFAULT_BUILD_CONFIGURATION));
        if let Some(output) = output {
            spec = spec.arg("--output").quoted(output);
        }
        if let Some(runtime) = non_empty(&params.runtime) {
            spec = spec.arg("--runtime").arg(runtime);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn add_package(&self, params: &AddPackageParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self
            .base()
            .arg("add")
            .quoted(&project)
            .arg("package")
            .arg(&params.package_name);
        if let Some(version) = non_empty(&params.version) {
            spec = spec.arg("--version").arg(version);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn remove_package(&self, params: &PackageParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        self.base()
            .arg("remove")
            .quoted(&project)
            .arg("package")
            .arg(&params.package_name)
            .cwd(working_dir(&project))
    }

    pub fn list_packages(&self, params: &ProjectParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        self.base()
            .arg("list")
            .quoted(&project)
            .arg("package")
            .cwd(working_dir(&project))
    }

    pub fn restore(&self, params: &ProjectParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        self.base()
            .arg("restore")
            .quoted(&project)
            .cwd(working_dir(&project))
    }

    pub fn add_migration(&self, params: &AddMigrationParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);
        let output_dir = self.translate_optional(&params.output_dir);

        let mut spec = self
            .base()
            .args(["ef", "migrations", "add"])
            .arg(&params.migration_name)
            .arg("--project")
            .quoted(&project);
        if let Some(context) = non_empty(&params.db_context) {
            spec = spec.arg("--context").arg(context);
        }
        if let Some(output_dir) = output_dir {
            spec = spec.arg("--output-dir").quoted(output_dir);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn remove_migration(&self, params: &MigrationParams) -> CommandSpec {
        self.migration_command("remove", params)
    }

    pub fn list_migrations(&self, params: &MigrationParams) -> CommandSpec {
        self.migration_command("list", params)
    }

    fn migration_command(&self, action: &str, params: &MigrationParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self
            .base()
            .args(["ef", "migrations", action])
            .arg("--project")
            .quoted(&project);
        if let Some(context) = non_empty(&params.db_context) {
            spec = spec.arg("--context").arg(context);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn update_database(&self, params: &UpdateDatabaseParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self.base().args(["ef", "database", "update"]);
        if let Some(migration) = non_empty(&params.migration) {
            spec = spec.arg(migration);
        }
        spec = spec.arg("--project").quoted(&project);
        if let Some(context) = non_empty(&params.db_context) {
            spec = spec.arg("--context").arg(context);
        }
        spec.cwd(working_dir(&project))
    }

    pub fn create_project(&self, params: &CreateProjectParams) -> CommandSpec {
        let output = self.translate_optional(&params.output_path);

        let mut spec = self
            .base()
            .arg("new")
            .arg(&params.project_type)
            .arg("--name")
            .arg(&params.project_name);
        if let Some(output) = &output {
            spec = spec.arg("--output").quoted(output);
        }
        if let Some(framework) = non_empty(&params.framework) {
            spec = spec.arg("--framework").arg(framework);
        }

        // The template creates the output directory; only run inside it when it already exists
        let cwd = output
            .filter(|dir| Path::new(dir).is_dir())
            .map(PathBuf::from);
        spec.cwd(cwd)
    }

    pub fn add_reference(&self, params: &ReferenceParams) -> CommandSpec {
        self.reference_command("add", params)
    }

    pub fn remove_reference(&self, params: &ReferenceParams) -> CommandSpec {
        self.reference_command("remove", params)
    }

    fn reference_command(&self, action: &str, params: &ReferenceParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);
        let referenced = self.translator.translate(&params.referenced_project_path);

        self.base()
            .arg(action)
            .quoted(&project)
            .arg("reference")
            .quoted(referenced)
            .cwd(working_dir(&project))
    }

    pub fn list_references(&self, params: &ProjectParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        self.base()
            .arg("list")
            .quoted(&project)
            .arg("reference")
            .cwd(working_dir(&project))
    }

    pub fn test(&self, params: &RunTestsParams) -> CommandSpec {
        let project = self.translator.translate(&params.project_path);

        let mut spec = self
            .base()
            .arg("test")
            .quoted(&project)
            .arg("--configuration")
            .arg(configuration(&params.configuration, DEFAULT_RUN_CONFIGURATION));
        if let Some(filter) = non_empty(&params.filter) {
            spec = spec.arg("--filter").quoted(filter);
        }
        if params.collect_coverage {
            spec = spec.arg("--collect").quoted("Code Coverage");
        }
        spec.cwd(working_dir(&project))
    }

    fn base(&self) -> CommandSpec {
        CommandSpec::new(&self.program)
    }

    fn translate_optional(&self, path: &Option<String>) -> Option<String> {
        self.translator.translate_opt(non_empty(path))
    }

    /// Split free-form arguments with shell-word rules.
    ///
    /// Native Windows paths use `\` as a separator, so on translating hosts
    /// backslashes are kept literal instead of acting as escapes.
    fn split_args(&self, raw: &str) -> Vec<String> {
        let input = if self.translator.is_translating() {
            raw.replace('\\', "\\\\")
        } else {
            raw.to_string()
        };
        shlex::split(&input).unwrap_or_else(|| raw.split_whitespace().map(String::from).collect())
    }
}

/// Directory of the project when it exists on this host. A missing
/// directory leaves the cwd unset so the toolchain reports the bad path.
fn working_dir(project: &str) -> Option<PathBuf> {
    project_dir(project).filter(|dir| dir.is_dir())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn configuration<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    non_empty(value).unwrap_or(default)
}
