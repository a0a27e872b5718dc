// Meeting client CLI
// Signs in, browses organizations and meetings, attends a meeting headlessly
// and prints post-meeting reports

use std::sync::Arc;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meeting_room_client::api::types::CreateOrganizationRequest;
use meeting_room_client::account::PasswordReset;
use meeting_room_client::dashboard::{
    format_meeting_time, home_window_start, image_url, remaining_minutes, HomeOverview,
    OrganizationDashboard,
};
use meeting_room_client::report::MeetingReport;
use meeting_room_client::room::{Layout, SyntheticSource};
use meeting_room_client::sdk::{CallJournal, HeadlessChatClient, HeadlessVideoClient};
use meeting_room_client::{
    BackendClient, Config, FileTokenStore, MeetError, MeetingRoom, Result, RoomServices,
    SessionResolver, TokenStore,
};

#[derive(Parser)]
#[command(name = "meet-cli")]
#[command(about = "Meeting client CLI", long_about = None)]
struct Cli {
    /// Backend URL (overrides MEET_API_URL)
    #[arg(short, long)]
    api_url: Option<String>,

    /// Token file (overrides MEET_TOKEN_FILE)
    #[arg(long)]
    token_file: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an auth token and check it against the backend
    Login {
        #[arg(short, long)]
        token: String,
    },

    /// Forget the stored auth token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Organizations plus running and upcoming meetings
    Home,

    /// Organization commands
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Meeting commands
    Meeting {
        #[command(subcommand)]
        command: MeetingCommands,
    },

    /// Post-meeting engagement report
    Report {
        /// Meeting ID
        meeting_id: i64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Password reset flow
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },
}

#[derive(Subcommand)]
enum OrgCommands {
    /// Organization dashboard
    Show { organization_id: i64 },

    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Email domain members must belong to
        #[arg(long, default_value = "")]
        domain: String,

        /// Only admit members from the domain
        #[arg(long)]
        restrict_domain: bool,
    },

    /// Join an organization with its invite code
    Join { code: String },

    /// Issue a new invite code (owner only)
    RotateCode { organization_id: i64 },
}

#[derive(Subcommand)]
enum MeetingCommands {
    /// Resolve the session for a meeting; leaves again unless attending
    Join {
        meeting_id: i64,

        /// Stay in the call until Ctrl+C
        #[arg(long)]
        attend: bool,

        /// Join with the camera off
        #[arg(long)]
        camera_off: bool,
    },
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Mail a reset code
    Request { email: String },

    Verify { email: String, code: String },

    /// Set a new password with a verified code
    Reset {
        email: String,
        code: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        confirm: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "meeting_room_client=info,meet_cli=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = Config::from_env();
    if let Some(url) = &cli.api_url {
        config.backend.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = &cli.token_file {
        config.token_file = path.into();
    }
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_file.clone()));

    let result = match cli.command {
        Commands::Login { token } => login(config, tokens, &token).await,
        Commands::Logout => logout(tokens.as_ref()),
        Commands::Whoami => whoami(config, tokens.as_ref()).await,
        Commands::Home => home(config, tokens.as_ref()).await,
        Commands::Org { command } => org(config, tokens.as_ref(), command).await,
        Commands::Meeting {
            command:
                MeetingCommands::Join {
                    meeting_id,
                    attend,
                    camera_off,
                },
        } => join_meeting(config, tokens.as_ref(), meeting_id, attend, camera_off).await,
        Commands::Report { meeting_id, json } => report(config, tokens.as_ref(), meeting_id, json).await,
        Commands::Password { command } => password(config, tokens, command).await,
    };

    if let Err(e) = result {
        println!("{} {}", "✗".red(), e);
        if e.is_auth() {
            println!("  Run {} to sign in", "meet-cli login --token <TOKEN>".bold());
        }
        std::process::exit(1);
    }
}

fn client(config: Config, tokens: &dyn TokenStore) -> Result<BackendClient> {
    let client = BackendClient::new(config, tokens)?;
    if client.token().is_none() {
        return Err(MeetError::MissingToken);
    }
    Ok(client)
}

async fn login(config: Config, tokens: Arc<dyn TokenStore>, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(MeetError::InvalidInput("token is empty".to_string()));
    }

    let client = BackendClient::with_token(config, Some(token.to_string()))?;
    let user = client.current_user().await?;
    tokens.save(token)?;

    println!("{} Signed in as {} (id {})", "✓".green(), user.name.bold(), user.id);
    Ok(())
}

fn logout(tokens: &dyn TokenStore) -> Result<()> {
    tokens.clear()?;
    println!("{} Signed out", "✓".green());
    Ok(())
}

async fn whoami(config: Config, tokens: &dyn TokenStore) -> Result<()> {
    let client = client(config, tokens)?;
    let user = client.current_user().await?;

    println!("{} {}", "User:".bold(), user.name.green().bold());
    println!("  ID: {}", user.id);
    if let Some(email) = &user.email {
        println!("  Email: {}", email);
    }
    if let Some(path) = &user.image_path {
        println!("  Avatar: {}", image_url(&client.config().backend.api_url, path));
    }
    Ok(())
}

async fn home(config: Config, tokens: &dyn TokenStore) -> Result<()> {
    let client = client(config, tokens)?;
    let now = Utc::now();
    let home = client.user_home(home_window_start(now)).await?;
    let overview = HomeOverview::build(&home, now);

    println!("{} {}", "Welcome,".cyan(), overview.name.bold());

    println!("\n{}", "Organizations".bold());
    if overview.organizations.is_empty() {
        println!("  {}", "none yet, create or join one".dimmed());
    }
    for org in &overview.organizations {
        let badge = if org.owned { "owner".green() } else { "member".normal() };
        println!(
            "  [{}] {} ({}, {} participants)",
            org.id,
            org.name.bold(),
            badge,
            org.total_participants.unwrap_or(0)
        );
    }

    println!("\n{}", "Running".bold());
    for m in &overview.running {
        println!(
            "  {} [{}] {} ({} min left)",
            "●".green(),
            m.id,
            m.name,
            remaining_minutes(m, now)
        );
    }

    println!("\n{}", "Upcoming".bold());
    for m in &overview.upcoming {
        println!("  [{}] {} {}", m.id, m.name, format_meeting_time(m.start_time, Local::now()).dimmed());
    }
    Ok(())
}

async fn org(config: Config, tokens: &dyn TokenStore, command: OrgCommands) -> Result<()> {
    let client = client(config, tokens)?;

    match command {
        OrgCommands::Show { organization_id } => {
            let now = Utc::now();
            let org = client.organization(organization_id).await?;
            let dashboard = OrganizationDashboard::build(&org, now);

            println!("{}", "═".repeat(50).green());
            println!("{} {}", "Organization:".bold(), dashboard.name.green().bold());
            if let Some(code) = &dashboard.code {
                println!("{} {}", "Invite code:".bold(), code);
            }
            if let Some(owner) = &dashboard.owner {
                println!("{} {}", "Owner:".bold(), owner.name);
            }
            println!("{}", "═".repeat(50).green());

            println!("\n{} ({})", "Members".bold(), dashboard.members.len());
            for member in &dashboard.members {
                println!("  {}", member.user.name);
            }

            println!("\n{}", "Running".bold());
            for m in &dashboard.running {
                println!("  [{}] {} ({} min left)", m.id, m.name, remaining_minutes(m, now));
            }

            println!("\n{}", "Upcoming".bold());
            for m in &dashboard.upcoming {
                println!("  [{}] {} {}", m.id, m.name, format_meeting_time(m.start_time, Local::now()));
            }

            println!("\n{}", "Meetings".bold());
            for row in &dashboard.meetings {
                let engagement = match row.engagement {
                    Some((value, _)) => format!("{:.0}%", value),
                    None => "-".to_string(),
                };
                println!(
                    "  [{}] {:<24} {:>4} min  {:<12} {}",
                    row.id,
                    row.name,
                    row.duration_minutes,
                    row.status.label(),
                    engagement
                );
            }
        }
        OrgCommands::Create {
            name,
            description,
            domain,
            restrict_domain,
        } => {
            let request = CreateOrganizationRequest {
                name: name.trim().to_string(),
                description,
                domain_name: domain,
                domain_restriction_flag: restrict_domain,
            };
            if request.name.is_empty() {
                return Err(MeetError::InvalidInput("organization name is empty".to_string()));
            }
            client.create_organization(&request).await?;
            println!("{} Organization {} created", "✓".green(), request.name.bold());
        }
        OrgCommands::Join { code } => {
            client.join_organization(&code).await?;
            println!("{} Joined organization", "✓".green());
        }
        OrgCommands::RotateCode { organization_id } => {
            let code = client.change_organization_code(organization_id).await?;
            println!("{} New invite code: {}", "✓".green(), code.green().bold());
        }
    }
    Ok(())
}

async fn join_meeting(
    config: Config,
    tokens: &dyn TokenStore,
    meeting_id: i64,
    attend: bool,
    camera_off: bool,
) -> Result<()> {
    let backend = Arc::new(client(config.clone(), tokens)?);
    let resolver = SessionResolver::new(backend.clone());
    let joined = if attend {
        resolver.resolve(meeting_id).await?
    } else {
        resolver.resolve_and_leave(meeting_id).await?
    };

    println!("{} Joined meeting {}", "✓".green(), meeting_id);
    println!("  Role: {}", joined.session.role.to_string().bold());
    println!("  Chat channel: {}", joined.session.chat_channel_id());

    if !attend {
        println!("{} Left meeting {}", "✓".green(), meeting_id);
        return Ok(());
    }

    let journal = CallJournal::default();
    let services = RoomServices {
        backend,
        video: Arc::new(HeadlessVideoClient::new(journal.clone())),
        chat: Arc::new(HeadlessChatClient::new(journal)),
        source: Arc::new(SyntheticSource),
    };
    let (room, handle) = MeetingRoom::open(joined, services, &config).await?;
    if camera_off {
        handle.set_camera(false);
    }

    print_layout(&room.layout());
    println!("  Clock {}", room.clock());
    println!("{}", "In the call, press Ctrl+C to leave".cyan());

    let leaver = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            leaver.leave();
        }
    });

    let exit = room.run().await;
    println!("{} Call closed ({:?})", "✓".green(), exit);
    Ok(())
}

fn print_layout(layout: &Layout) {
    if let Some(presenter) = layout.presenter() {
        println!("{} {}", "Presenting:".bold(), presenter.label.green());
    }
    for tile in layout.tiles() {
        let mut badges = Vec::new();
        if tile.muted_badge {
            badges.push("muted");
        }
        if tile.camera_off_badge {
            badges.push("camera off");
        }
        if tile.speaking {
            badges.push("speaking");
        }
        println!("  ({}) {} {}", tile.initial, tile.label, badges.join(", ").dimmed());
    }
}

async fn report(config: Config, tokens: &dyn TokenStore, meeting_id: i64, json: bool) -> Result<()> {
    let client = client(config, tokens)?;
    let meeting = client.meeting(meeting_id).await?;
    let report = MeetingReport::build(&meeting);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "═".repeat(50).green());
    println!("{} {}", "Meeting Report:".bold(), report.name.green().bold());
    println!(
        "  {} · {} · {} participants",
        format_meeting_time(report.started_at, Local::now()),
        report.duration,
        report.participant_count
    );
    println!("{}", "═".repeat(50).green());

    let e = &report.engagement;
    println!("\n{}", "Engagement".bold());
    println!("  Average {}%  Peak {}%  Lowest {}%", e.average, e.peak, e.lowest);

    let a = &report.attendance;
    println!("\n{}", "Attendance".bold());
    println!(
        "  On time {}  Late {}  Left early {}  Rate {}%",
        a.on_time, a.late, a.early_leave, a.rate
    );

    println!("\n{}", "Timeline (interpolated)".bold());
    for point in &report.timeline {
        println!("  {} {:>3}% {}", point.label, point.engagement, "▇".repeat((point.engagement / 5) as usize));
    }

    println!("\n{}", "Participants".bold());
    for row in &report.participants {
        let tier = match row.tier.label() {
            "high" => row.tier.label().green(),
            "moderate" => row.tier.label().yellow(),
            _ => row.tier.label().red(),
        };
        println!(
            "  ({:<2}) {:<24} {:>3}% {:<9} active {}",
            row.initials, row.name, row.composite, tier, row.active
        );
    }

    let d = &report.metrics;
    println!("\n{}", "Details".bold());
    println!("  Focus time {}h", d.focus_hours);
    println!("  Consistency {}%", d.consistency);
    println!("  Active participation {}%", d.active_participation);
    println!("  Session quality {}%", d.session_quality);
    println!(
        "\n  {} showed high engagement, {} may need follow-up",
        report.high_engagement, report.needs_follow_up
    );
    Ok(())
}

async fn password(config: Config, tokens: Arc<dyn TokenStore>, command: PasswordCommands) -> Result<()> {
    // Reset runs signed out, so the client carries no token
    let backend = BackendClient::with_token(config, None)?;

    match command {
        PasswordCommands::Request { email } => {
            let mut flow = PasswordReset::new(backend, tokens, &email)?;
            flow.request_code().await?;
            println!("{} Reset code sent to {}", "✓".green(), flow.email());
        }
        PasswordCommands::Verify { email, code } => {
            let mut flow = PasswordReset::new(backend, tokens, &email)?;
            flow.verify(&code).await?;
            println!("{} Code verified", "✓".green());
        }
        PasswordCommands::Reset {
            email,
            code,
            password,
            confirm,
        } => {
            let mut flow = PasswordReset::new(backend, tokens, &email)?.with_code(&code);
            flow.set_password(&password, &confirm).await?;
            println!("{} Password updated, signed in", "✓".green());
        }
    }
    Ok(())
}
