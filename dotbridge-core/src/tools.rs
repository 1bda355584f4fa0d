//! Tool surface: parameter types, the dispatch enum and the static catalogue
//! rendered into JSON schemas for remote callers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{DotbridgeError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParams {
    pub project_path: String,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub additional_args: Option<String>,
    #[serde(default)]
    pub suppress_warnings: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanParams {
    pub project_path: String,
    #[serde(default)]
    pub configuration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub project_path: String,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishParams {
    pub project_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
}

/// Parameters of tools that only need the project path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParams {
    pub project_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPackageParams {
    pub project_path: String,
    pub package_name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageParams {
    pub project_path: String,
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMigrationParams {
    pub project_path: String,
    pub migration_name: String,
    #[serde(default)]
    pub db_context: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationParams {
    pub project_path: String,
    #[serde(default)]
    pub db_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseParams {
    pub project_path: String,
    #[serde(default)]
    pub migration: Option<String>,
    #[serde(default)]
    pub db_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectParams {
    pub project_type: String,
    pub project_name: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceParams {
    pub project_path: String,
    pub referenced_project_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsParams {
    pub project_path: String,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub collect_coverage: bool,
}

/// One remotely invocable operation together with its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    BuildProject(BuildParams),
    RebuildProject(BuildParams),
    CleanProject(CleanParams),
    RunProject(RunParams),
    PublishProject(PublishParams),
    GetProjectInfo(ProjectParams),
    AddPackage(AddPackageParams),
    RemovePackage(PackageParams),
    ListPackages(ProjectParams),
    RestorePackages(ProjectParams),
    AddMigration(AddMigrationParams),
    RemoveMigration(MigrationParams),
    ListMigrations(MigrationParams),
    UpdateDatabase(UpdateDatabaseParams),
    CreateProject(CreateProjectParams),
    AddProjectReference(ReferenceParams),
    RemoveProjectReference(ReferenceParams),
    ListProjectReferences(ProjectParams),
    RunTests(RunTestsParams),
}

impl ToolCall {
    /// Decode a call from a tool name and its JSON arguments object
    pub fn from_name(name: &str, arguments: Value) -> Result<Self> {
        if find_tool(name).is_none() {
            return Err(DotbridgeError::UnknownTool(name.to_string()));
        }

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        serde_json::from_value(json!({ "tool": name, "arguments": arguments })).map_err(|e| {
            DotbridgeError::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::BuildProject(_) => "build_project",
            ToolCall::RebuildProject(_) => "rebuild_project",
            ToolCall::CleanProject(_) => "clean_project",
            ToolCall::RunProject(_) => "run_project",
            ToolCall::PublishProject(_) => "publish_project",
            ToolCall::GetProjectInfo(_) => "get_project_info",
            ToolCall::AddPackage(_) => "add_package",
            ToolCall::RemovePackage(_) => "remove_package",
            ToolCall::ListPackages(_) => "list_packages",
            ToolCall::RestorePackages(_) => "restore_packages",
            ToolCall::AddMigration(_) => "add_migration",
            ToolCall::RemoveMigration(_) => "remove_migration",
            ToolCall::ListMigrations(_) => "list_migrations",
            ToolCall::UpdateDatabase(_) => "update_database",
            ToolCall::CreateProject(_) => "create_project",
            ToolCall::AddProjectReference(_) => "add_project_reference",
            ToolCall::RemoveProjectReference(_) => "remove_project_reference",
            ToolCall::ListProjectReferences(_) => "list_project_references",
            ToolCall::RunTests(_) => "run_tests",
        }
    }

    /// Gerund phrase used in `Error <action>: ...` messages
    pub fn action(&self) -> &'static str {
        match self {
            ToolCall::BuildProject(_) => "building project",
            ToolCall::RebuildProject(_) => "rebuilding project",
            ToolCall::CleanProject(_) => "cleaning project",
            ToolCall::RunProject(_) => "running project",
            ToolCall::PublishProject(_) => "publishing project",
            ToolCall::GetProjectInfo(_) => "getting project info",
            ToolCall::AddPackage(_) => "adding package",
            ToolCall::RemovePackage(_) => "removing package",
            ToolCall::ListPackages(_) => "listing packages",
            ToolCall::RestorePackages(_) => "restoring packages",
            ToolCall::AddMigration(_) => "adding migration",
            ToolCall::RemoveMigration(_) => "removing migration",
            ToolCall::ListMigrations(_) => "listing migrations",
            ToolCall::UpdateDatabase(_) => "updating database",
            ToolCall::CreateProject(_) => "creating project",
            ToolCall::AddProjectReference(_) => "adding project reference",
            ToolCall::RemoveProjectReference(_) => "removing project reference",
            ToolCall::ListProjectReferences(_) => "listing project references",
            ToolCall::RunTests(_) => "running tests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDef],
}

impl ToolDef {
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            let kind = match param.kind {
                ParamKind::String => "string",
                ParamKind::Boolean => "boolean",
            };
            properties.insert(
                param.name.to_string(),
                json!({ "type": kind, "description": param.description }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

const fn required(name: &'static str, description: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamKind::String,
        required: true,
        description,
    }
}

const fn optional(name: &'static str, description: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamKind::String,
        required: false,
        description,
    }
}

const fn flag(name: &'static str, description: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamKind::Boolean,
        required: false,
        description,
    }
}

const PROJECT_PATH: ParamDef = required(
    "projectPath",
    "Full path to the .csproj or .sln file; /mnt/<drive>/... and <DRIVE>:\\... forms are both accepted",
);
const DB_CONTEXT: ParamDef = optional("dbContext", "DbContext class to use");

pub static TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "build_project",
        description: "Build a .NET project or solution with `dotnet build`. Set suppressWarnings=true to add --nologo -v q --property WarningLevel=0 /clp:ErrorsOnly.",
        params: &[
            PROJECT_PATH,
            optional("configuration", "Build configuration (default: Release)"),
            optional("additionalArgs", "Extra arguments appended to the command"),
            flag("suppressWarnings", "Only report errors"),
        ],
    },
    ToolDef {
        name: "rebuild_project",
        description: "Rebuild a .NET project from scratch (`dotnet build --no-incremental`). Set suppressWarnings=true to only report errors.",
        params: &[
            PROJECT_PATH,
            optional("configuration", "Build configuration (default: Release)"),
            optional("additionalArgs", "Extra arguments appended to the command"),
            flag("suppressWarnings", "Only report errors"),
        ],
    },
    ToolDef {
        name: "clean_project",
        description: "Remove build outputs of a .NET project with `dotnet clean`.",
        params: &[
            PROJECT_PATH,
            optional("configuration", "Configuration to clean (default: Release)"),
        ],
    },
    ToolDef {
        name: "run_project",
        description: "Run a .NET project with `dotnet run` and wait for it to exit.",
        params: &[
            PROJECT_PATH,
            optional("arguments", "Arguments passed to the program after --"),
            optional("configuration", "Build configuration (default: Debug)"),
        ],
    },
    ToolDef {
        name: "publish_project",
        description: "Publish a .NET project for deployment with `dotnet publish`.",
        params: &[
            PROJECT_PATH,
            optional("outputPath", "Directory receiving the published output"),
            optional("configuration", "Build configuration (default: Release)"),
            optional("runtime", "Target runtime identifier, e.g. win-x64"),
        ],
    },
    ToolDef {
        name: "get_project_info",
        description: "Read target framework, output type and UI toolkit from a project file.",
        params: &[PROJECT_PATH],
    },
    ToolDef {
        name: "add_package",
        description: "Add a NuGet package to a project.",
        params: &[
            PROJECT_PATH,
            required("packageName", "NuGet package id"),
            optional("version", "Package version (default: latest)"),
        ],
    },
    ToolDef {
        name: "remove_package",
        description: "Remove a NuGet package from a project.",
        params: &[PROJECT_PATH, required("packageName", "NuGet package id")],
    },
    ToolDef {
        name: "list_packages",
        description: "List NuGet packages referenced by a project.",
        params: &[PROJECT_PATH],
    },
    ToolDef {
        name: "restore_packages",
        description: "Restore NuGet dependencies of a project with `dotnet restore`.",
        params: &[PROJECT_PATH],
    },
    ToolDef {
        name: "add_migration",
        description: "Create an Entity Framework migration.",
        params: &[
            PROJECT_PATH,
            required("migrationName", "Name of the new migration"),
            DB_CONTEXT,
            optional("outputDir", "Directory receiving the migration files"),
        ],
    },
    ToolDef {
        name: "remove_migration",
        description: "Remove the most recent Entity Framework migration.",
        params: &[PROJECT_PATH, DB_CONTEXT],
    },
    ToolDef {
        name: "list_migrations",
        description: "List applied and pending Entity Framework migrations.",
        params: &[PROJECT_PATH, DB_CONTEXT],
    },
    ToolDef {
        name: "update_database",
        description: "Apply Entity Framework migrations to the database.",
        params: &[
            PROJECT_PATH,
            optional("migration", "Target migration (default: latest)"),
            DB_CONTEXT,
        ],
    },
    ToolDef {
        name: "create_project",
        description: "Create a new .NET project from a template with `dotnet new`.",
        params: &[
            required("projectType", "Template short name, e.g. console, classlib, wpf"),
            required("projectName", "Name of the new project"),
            optional("outputPath", "Directory to create the project in"),
            optional("framework", "Target framework, e.g. net8.0"),
        ],
    },
    ToolDef {
        name: "add_project_reference",
        description: "Add a project-to-project reference.",
        params: &[
            PROJECT_PATH,
            required("referencedProjectPath", "Path to the project being referenced"),
        ],
    },
    ToolDef {
        name: "remove_project_reference",
        description: "Remove a project-to-project reference.",
        params: &[
            PROJECT_PATH,
            required("referencedProjectPath", "Path to the referenced project"),
        ],
    },
    ToolDef {
        name: "list_project_references",
        description: "List projects referenced by a project.",
        params: &[PROJECT_PATH],
    },
    ToolDef {
        name: "run_tests",
        description: "Run unit tests with `dotnet test`.",
        params: &[
            PROJECT_PATH,
            optional("configuration", "Build configuration (default: Debug)"),
            optional("filter", "Test filter expression"),
            flag("collectCoverage", "Collect code coverage"),
        ],
    },
];

pub fn find_tool(name: &str) -> Option<&'static ToolDef> {
    TOOLS.iter().find(|t| t.name == name)
}
