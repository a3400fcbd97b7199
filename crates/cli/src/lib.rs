pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use leavedesk_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use leavedesk_core::dispatch::Decision;
use leavedesk_core::domain::approver::ApprovalLevel;

use crate::commands::proxy::GrantArgs;
use crate::commands::requests::{ListArgs, SubmitArgs};
use crate::commands::{CommandResult, EXIT_VALIDATION};

#[derive(Debug, Parser)]
#[command(
    name = "leavedesk",
    about = "Leave management client CLI",
    long_about = "Work approval queues, delegations, bulk imports and audit exports against the leave-management API.",
    after_help = "Examples:\n  leavedesk login --username somchai\n  leavedesk queue --level 3 --location '?proxy=11'\n  leavedesk decide --level 3 --detail 77 --action reject --remarks 'เอกสารไม่ครบ'\n  leavedesk doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct GlobalArgs {
    #[arg(
        long,
        global = true,
        help = "Config file (default: leavedesk.toml or config/leavedesk.toml)"
    )]
    config: Option<PathBuf>,
    #[arg(long = "base-url", global = true, help = "Override api.base_url")]
    base_url: Option<String>,
    #[arg(long = "token-path", global = true, help = "Override session.token_path")]
    token_path: Option<PathBuf>,
    #[arg(long = "log-level", global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                api_base_url: self.base_url.clone(),
                api_token: None,
                session_token_path: self.token_path.clone(),
                log_level: self.log_level.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Sign in; the password is read from LEAVEDESK_PASSWORD or stdin")]
    Login {
        #[arg(long)]
        username: String,
    },
    #[command(about = "Forget the stored session")]
    Logout,
    #[command(about = "Show the signed-in user and the approval levels they hold")]
    Whoami,
    #[command(about = "List pending requests for an approval level, optionally as a proxy")]
    Queue {
        #[arg(long, help = "Approval level 1..=5")]
        level: ApprovalLevel,
        #[arg(long, default_value = "", help = "Queue address, e.g. '?proxy=11'")]
        location: String,
        #[command(flatten)]
        list: ListArgs,
    },
    #[command(about = "List your own leave requests")]
    History {
        #[command(flatten)]
        list: ListArgs,
    },
    #[command(about = "Approve, reject or confirm receipt for one approval step")]
    Decide {
        #[arg(long)]
        level: ApprovalLevel,
        #[arg(long, help = "Approval step (leave request detail) id")]
        detail: i64,
        #[arg(long, help = "approve, reject or receipt")]
        action: Decision,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long, default_value = "", help = "Queue address, e.g. '?proxy=11'")]
        location: String,
    },
    #[command(about = "Cancel a leave request (admin)")]
    Cancel {
        #[arg(long)]
        request: i64,
        #[arg(long)]
        remarks: Option<String>,
    },
    #[command(about = "Submit a leave request")]
    Submit {
        #[arg(long = "leave-type")]
        leave_type: i64,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, help = "Days requested; counted from the holiday calendar when omitted")]
        days: Option<f64>,
        #[arg(long)]
        reason: String,
    },
    #[command(about = "List approvers for a level on a date, delegates included")]
    Approvers {
        #[arg(long)]
        level: ApprovalLevel,
        #[arg(long)]
        date: NaiveDate,
    },
    #[command(subcommand, about = "Manage approval delegations")]
    Proxy(ProxyCommand),
    #[command(about = "Bulk-create users from one Excel workbook")]
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    #[command(subcommand, about = "Audit log operations")]
    Audit(AuditCommand),
    #[command(about = "Load reference data; count working days for a date range")]
    Reference {
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check configuration, session and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct GrantFlags {
    #[arg(long)]
    original: i64,
    #[arg(long)]
    proxy: i64,
    #[arg(long)]
    level: ApprovalLevel,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long, help = "Last day; a single-day grant when omitted")]
    to: Option<NaiveDate>,
    #[arg(long)]
    reason: Option<String>,
}

impl From<GrantFlags> for GrantArgs {
    fn from(flags: GrantFlags) -> Self {
        Self {
            original_approver_id: flags.original,
            proxy_approver_id: flags.proxy,
            level: flags.level,
            start_date: flags.from,
            end_date: flags.to,
            reason: flags.reason,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ProxyCommand {
    #[command(about = "List delegations")]
    List,
    #[command(about = "Create a delegation after checking for overlapping grants")]
    Create(GrantFlags),
    #[command(about = "Change an existing delegation")]
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        grant: GrantFlags,
    },
    #[command(about = "Cancel a delegation")]
    Cancel {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum AuditCommand {
    #[command(about = "Export every audit log entry as CSV")]
    Export {
        #[arg(long)]
        action: Option<String>,
        #[arg(long, default_value = "audit-logs.csv")]
        output: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.global.load_options());

    let result = dispatch(cli);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub fn dispatch(cli: Cli) -> CommandResult {
    let options = cli.global.load_options();

    match cli.command {
        Command::Login { username } => match commands::auth::read_password() {
            Ok(password) => commands::auth::login(options, &username, password),
            Err(error) => CommandResult::failure(
                "login",
                "input",
                format!("could not read password: {error:#}"),
                EXIT_VALIDATION,
            ),
        },
        Command::Logout => commands::auth::logout(options),
        Command::Whoami => commands::auth::whoami(options),
        Command::Queue { level, location, list } => {
            commands::requests::queue(options, level, &location, &list)
        }
        Command::History { list } => commands::requests::history(options, &list),
        Command::Decide { level, detail, action, remarks, location } => {
            commands::requests::decide(options, level, detail, action, remarks, &location)
        }
        Command::Cancel { request, remarks } => {
            commands::requests::cancel(options, request, remarks)
        }
        Command::Submit { leave_type, from, to, days, reason } => commands::requests::submit(
            options,
            SubmitArgs { leave_type_id: leave_type, start_date: from, end_date: to, days, reason },
        ),
        Command::Approvers { level, date } => {
            commands::directory::approvers(options, level, date)
        }
        Command::Proxy(ProxyCommand::List) => commands::proxy::list(options),
        Command::Proxy(ProxyCommand::Create(grant)) => {
            commands::proxy::create(options, grant.into())
        }
        Command::Proxy(ProxyCommand::Update { id, grant }) => {
            commands::proxy::update(options, id, grant.into())
        }
        Command::Proxy(ProxyCommand::Cancel { id }) => commands::proxy::cancel(options, id),
        Command::Import { files } => commands::import::run(options, files),
        Command::Audit(AuditCommand::Export { action, output }) => {
            commands::audit::export(options, action, output)
        }
        Command::Reference { from, to } => {
            commands::reference::run(options, from.zip(to))
        }
        Command::Config => {
            CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    }
}

/// Logs go to stderr so stdout stays one JSON document per command. A
/// config that fails to load still gets warnings out; the command itself
/// reports the failure.
fn init_logging(options: &LoadOptions) {
    use tracing::Level;

    let config = AppConfig::load(options.clone()).ok();
    let log_level = config
        .as_ref()
        .and_then(|config| config.logging.level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);
    let format = config.map_or(LogFormat::Compact, |config| config.logging.format);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
