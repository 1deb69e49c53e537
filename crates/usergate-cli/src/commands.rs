//! Subcommand handlers. Each one is a "page": protected ones enter through a
//! guard first and only touch the backend once the view is allowed to render.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use tracing::{debug, info};
use usergate_core::auth::BackendKind;
use usergate_core::directory::UserDirectory;
use usergate_core::forms::{validate_email, LoginForm, SignupForm};
use usergate_core::models::UserUpdate;
use usergate_core::{ApiClient, ApiError, Config, SessionGuard};

use crate::format;
use crate::prompt;
use crate::view::{self, Entry};

/// Exit code for input the forms refused.
const EXIT_INVALID_INPUT: u8 = 1;

pub struct Context {
    config: Config,
    client: ApiClient,
}

impl Context {
    /// Load configuration, apply global flags and open the session store.
    pub fn new(matches: &ArgMatches) -> Result<Self> {
        let mut config = Config::load().context("Failed to load configuration")?;
        if let Some(url) = matches.get_one::<String>("api-url") {
            config.api_base_url = url.clone();
        }
        if matches.get_flag("ephemeral") {
            config.credential_backend = BackendKind::Memory;
        }

        let store = Arc::new(config.open_store().context("Failed to open session store")?);
        let client = config.api_client(store)?;
        debug!(
            api = %client.base_url(),
            backend = client.store().backend_name(),
            "Client ready"
        );
        Ok(Self { config, client })
    }

    fn session_guard(&self) -> SessionGuard {
        self.config.session_guard(self.client.clone())
    }

    fn admin_guard(&self) -> SessionGuard {
        self.config.admin_guard(self.client.clone())
    }
}

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("login", sub)) => login(ctx, sub).await,
        Some(("signup", sub)) => signup(ctx, sub).await,
        Some(("logout", _)) => logout(ctx),
        Some(("status", _)) => status(ctx).await,
        Some(("admin", _)) => admin(ctx).await,
        Some(("users", sub)) => match sub.subcommand() {
            Some(("list", _)) => users_list(ctx).await,
            Some(("show", args)) => users_show(ctx, required(args, "id")?).await,
            Some(("find", args)) => users_find(ctx, required(args, "name")?).await,
            Some(("edit", args)) => users_edit(ctx, args).await,
            Some(("delete", args)) => users_delete(ctx, args).await,
            _ => unreachable!("users subcommand is required"),
        },
        _ => unreachable!("subcommand is required"),
    }
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{}>", id))
}

fn invalid(err: impl std::fmt::Display) -> ExitCode {
    eprintln!("{}", err);
    ExitCode::from(EXIT_INVALID_INPUT)
}

/// Run a protected page body once `guard` lets it through.
async fn protected<F, Fut>(guard: SessionGuard, body: F) -> Result<ExitCode>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<ExitCode>>,
{
    match view::enter(&guard).await? {
        Entry::Granted => body().await,
        blocked => Ok(view::exit_code(blocked)),
    }
}

// ============================================================================
// Session
// ============================================================================

async fn login(ctx: &Context, args: &ArgMatches) -> Result<ExitCode> {
    let form = LoginForm {
        email: prompt::or_ask(args.get_one::<String>("email"), "Email")?,
        password: prompt::password("Password")?,
    };
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return Ok(invalid(e)),
    };

    println!("\nSigning in...");
    match ctx.client.login(&request).await {
        Ok(_) => {
            info!(email = %request.email, "Logged in");
            println!("Login successful!");
            Ok(ExitCode::SUCCESS)
        }
        Err(ApiError::Rejected { message, .. }) => Ok(invalid(message)),
        Err(e) => Err(e).context("Login failed"),
    }
}

async fn signup(ctx: &Context, args: &ArgMatches) -> Result<ExitCode> {
    let form = SignupForm {
        name: prompt::or_ask(args.get_one::<String>("name"), "Name")?,
        email: prompt::or_ask(args.get_one::<String>("email"), "Email")?,
        password: prompt::password("Password")?,
        confirm_password: prompt::password("Confirm password")?,
    };
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return Ok(invalid(e)),
    };

    println!("\nCreating account...");
    match ctx.client.register(&request).await {
        Ok(_) => {
            info!(email = %request.email, "Account created");
            println!("Account created. You are signed in as {}.", request.name);
            Ok(ExitCode::SUCCESS)
        }
        Err(ApiError::Rejected { message, .. }) => Ok(invalid(message)),
        Err(e) => Err(e).context("Sign up failed"),
    }
}

fn logout(ctx: &Context) -> Result<ExitCode> {
    ctx.client.logout().context("Failed to clear session")?;
    println!("Logged out.");
    Ok(ExitCode::SUCCESS)
}

async fn status(ctx: &Context) -> Result<ExitCode> {
    let guard = ctx.session_guard();
    let entry = view::enter(&guard).await?;

    let store = ctx.client.store();
    println!("API:      {}", ctx.client.base_url());
    println!("Backend:  {}", store.backend_name());
    match store.session() {
        Some(session) => println!("Session:  stored {}", session.age_display()),
        None => println!("Session:  none"),
    }
    println!("Verdict:  {}", view::describe(&guard.state()));

    Ok(view::exit_code(entry))
}

// ============================================================================
// Admin area
// ============================================================================

async fn admin(ctx: &Context) -> Result<ExitCode> {
    protected(ctx.admin_guard(), move || async move {
        println!("Access authorized.");
        let directory = UserDirectory::load(&ctx.client)
            .await
            .context("Failed to load users")?;
        println!("Total users: {}", directory.len());
        Ok(ExitCode::SUCCESS)
    })
    .await
}

async fn users_list(ctx: &Context) -> Result<ExitCode> {
    protected(ctx.admin_guard(), move || async move {
        let directory = UserDirectory::load(&ctx.client)
            .await
            .context("Failed to load users")?;
        if directory.is_empty() {
            println!("No users.");
        } else {
            print!("{}", format::user_table(directory.users()));
        }
        Ok(ExitCode::SUCCESS)
    })
    .await
}

/// The profile page only needs a signed-in user.
async fn users_show(ctx: &Context, id: &str) -> Result<ExitCode> {
    protected(ctx.session_guard(), move || async move {
        let user = ctx
            .client
            .get_user(id)
            .await
            .with_context(|| format!("Failed to load user {}", id))?;
        println!("{}", format::user_profile(&user));
        Ok(ExitCode::SUCCESS)
    })
    .await
}

async fn users_find(ctx: &Context, name: &str) -> Result<ExitCode> {
    protected(ctx.admin_guard(), move || async move {
        let directory = UserDirectory::load(&ctx.client)
            .await
            .context("Failed to load users")?;
        match directory.find_by_name(name) {
            Ok(user) => {
                println!("{}", format::user_profile(user));
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(invalid(e)),
        }
    })
    .await
}

async fn users_edit(ctx: &Context, args: &ArgMatches) -> Result<ExitCode> {
    let id = required(args, "id")?;
    let email = match args.get_one::<String>("email") {
        Some(email) => match validate_email(email) {
            Ok(email) => Some(email),
            Err(e) => return Ok(invalid(e)),
        },
        None => None,
    };
    let patch = UserUpdate {
        name: args
            .get_one::<String>("name")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        email,
    };
    if patch.is_empty() {
        return Ok(invalid("Nothing to change: pass --name and/or --email"));
    }

    protected(ctx.admin_guard(), move || async move {
        let mut directory = UserDirectory::load(&ctx.client)
            .await
            .context("Failed to load users")?;
        directory
            .update(&ctx.client, id, &patch)
            .await
            .with_context(|| format!("Failed to update user {}", id))?;

        println!("User updated.");
        if let Some(user) = directory.get(id) {
            println!("{}", format::user_profile(user));
        }
        Ok(ExitCode::SUCCESS)
    })
    .await
}

async fn users_delete(ctx: &Context, args: &ArgMatches) -> Result<ExitCode> {
    let id = required(args, "id")?;
    let skip_confirm = args.get_flag("yes");

    protected(ctx.admin_guard(), move || async move {
        let mut directory = UserDirectory::load(&ctx.client)
            .await
            .context("Failed to load users")?;
        let label = directory
            .get(id)
            .map(|u| format!("{} <{}>", u.name, u.email))
            .unwrap_or_else(|| id.to_string());

        if !skip_confirm {
            if !prompt::is_interactive() {
                return Ok(invalid("Refusing to delete without confirmation; pass --yes"));
            }
            if !prompt::confirm(&format!("Delete {}?", label), false)? {
                println!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
        }

        directory
            .remove(&ctx.client, id)
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;
        println!("Deleted {}. {} users remain.", label, directory.len());
        Ok(ExitCode::SUCCESS)
    })
    .await
}
