use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use tasarruf_admin::api::{ApiClient, ApiError, FetchError, MutationError};
use tasarruf_admin::associations::AssociationEditor;
use tasarruf_admin::auth::AuthService;
use tasarruf_admin::config::ConfigManager;
use tasarruf_admin::filters::{self, OfferFilter};
use tasarruf_admin::logging::{self, LogConfig};
use tasarruf_admin::notify::{LoadingFlag, Snackbar};
use tasarruf_admin::search::{Debouncer, UserSearch};
use tasarruf_admin::session::SessionContext;
use tasarruf_admin::storage::{FileStorageAdapter, MemoryStorageAdapter, StorageAdapter};
use tasarruf_types::{AccountType, Category, Id, NameRequest, PlanRequest, User};

/// Tasarruf admin - operator console for the Tasarruf offers platform
#[derive(Parser)]
#[command(name = "tasarruf-admin")]
#[command(about = "Manage customers, partners, plans and categories of the Tasarruf platform")]
#[command(version)]
struct Cli {
    /// Backend URL (also read from TASARRUF_API_URL)
    #[arg(long, short = 'u')]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    /// Write no log file
    #[arg(long, conflicts_with = "verbose")]
    no_log: bool,

    /// Keep the session in memory only
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with an admin account
    Login {
        email: String,
        #[arg(long, env = "TASARRUF_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged in admin
    Whoami,
    /// Text a one-time password to an admin's phone
    RecoverPassword { mobile: String },
    /// Customer, partner and offer counts
    Stats,
    /// List customers, or search them by email, name or mobile
    Customers {
        #[arg(long)]
        search: Option<String>,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// List partners
    Partners {
        /// Only partners waiting for approval
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        search: Option<String>,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// Search as you type: reads queries from stdin, one per line
    Search {
        /// Search partners instead of customers
        #[arg(long)]
        partners: bool,
    },
    /// Show one customer or partner
    User { id: Id },
    Approve { id: Id },
    Reject { id: Id },
    DeleteUser { id: Id },
    /// Activate or deactivate an account
    ToggleActive { id: Id },
    /// Mark a partner exclusive, or remove the mark
    Exclusive {
        id: Id,
        #[arg(long)]
        remove: bool,
    },
    /// Allow or forbid sharing a partner's offers
    ToggleSharable { id: Id },
    /// Branches of a partner
    Branches { partner_id: Id },
    Plans,
    /// Create a plan
    AddPlan {
        english_name: String,
        turkish_name: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        count_of_offers: u32,
        #[arg(long, default_value = "")]
        english_description: String,
        #[arg(long, default_value = "")]
        turkish_description: String,
        /// Image URL
        #[arg(long, default_value = "")]
        image: String,
        /// Plan given to new customers
        #[arg(long)]
        default: bool,
    },
    DeletePlan { plan_id: Id },
    /// Categories linked to a plan, and the ones that can still be linked
    PlanCategories { plan_id: Id },
    /// Link categories to a plan
    Associate { plan_id: Id, category_ids: Vec<Id> },
    /// Unlink a category from a plan
    Disassociate { plan_id: Id, category_id: Id },
    /// Edit a plan's fields and link extra categories in one go
    EditPlan {
        plan_id: Id,
        #[arg(long)]
        english_name: Option<String>,
        #[arg(long)]
        turkish_name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        count_of_offers: Option<u32>,
        #[arg(long = "add-category")]
        add_categories: Vec<Id>,
    },
    /// Move a user onto a plan
    UpgradePlan { user_id: Id, plan_id: Id },
    Categories,
    AddCategory { english_name: String, turkish_name: String },
    EditCategory { id: Id, english_name: String, turkish_name: String },
    DeleteCategory { id: Id },
    Cities,
    /// Show one city
    City { id: Id },
    AddCity { english_name: String, turkish_name: String },
    EditCity { id: Id, english_name: String, turkish_name: String },
    DeleteCity { id: Id },
    /// List offers, optionally for one customer and/or partner
    Offers {
        #[arg(long)]
        customer: Option<Id>,
        #[arg(long)]
        partner: Option<Id>,
    },
    /// Show support contact details
    Support,
    SetSupport { email: String, mobile: String },
    /// Show or change the saved configuration
    Config {
        /// Save this backend URL
        #[arg(long)]
        set_api_url: Option<String>,
    },
}

/// Everything a command needs
struct Console {
    client: ApiClient,
    auth: AuthService,
    config: ConfigManager,
    snackbar: Snackbar,
    loading: LoadingFlag,
    quiet_period: std::time::Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = dotenv::dotenv();

    let log_config = if cli.no_log {
        LogConfig::disabled()
    } else if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    logging::init_logging(&log_config)?;

    let config = ConfigManager::new()?;
    let settings = config.load_or_default()?;
    let api_url = config.determine_api_url(cli.api_url)?;
    log::info!("Using API at {}", api_url);

    let storage: Box<dyn StorageAdapter> = if cli.ephemeral {
        Box::new(MemoryStorageAdapter::new())
    } else {
        Box::new(FileStorageAdapter::with_path(config.token_path()))
    };
    let session = Arc::new(SessionContext::new(storage));
    let client = ApiClient::new(api_url, session).with_retry_policy(settings.retry_policy());

    let console = Console {
        auth: AuthService::new(client.clone()),
        client,
        config,
        snackbar: Snackbar::new(),
        loading: LoadingFlag::new(),
        quiet_period: settings.search_quiet_period(),
    };

    let result = console.run(cli.command).await;
    if let Err(e) = &result {
        log::error!("Command failed: {:#}", e);
        console.snackbar.error(describe_error(e));
    }
    console.flush_notices();

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

/// User-facing text for a failed command
fn describe_error(e: &anyhow::Error) -> String {
    let unauthenticated = e.chain().any(|cause| {
        matches!(cause.downcast_ref::<ApiError>(), Some(ApiError::Unauthenticated | ApiError::Unauthorized(_)))
            || matches!(cause.downcast_ref::<FetchError>(), Some(FetchError::Unauthenticated))
            || matches!(cause.downcast_ref::<MutationError>(), Some(MutationError::Unauthenticated))
    });
    if unauthenticated {
        "You are not logged in, run `tasarruf-admin login <email>`".to_string()
    } else {
        format!("{:#}", e)
    }
}

impl Console {
    fn flush_notices(&self) {
        for notice in self.snackbar.drain() {
            if notice.is_error {
                eprintln!("error: {}", notice.message);
            } else {
                eprintln!("{}", notice.message);
            }
        }
    }

    async fn run(&self, command: Command) -> Result<()> {
        let c = &self.client;
        match command {
            Command::Login { email, password } => {
                self.auth.login(&email, &password).await?;
                self.snackbar.open("Logged in successfully");
            }
            Command::Logout => {
                self.auth.logout();
                self.snackbar.open("Logged out");
            }
            Command::Whoami => {
                let admin = self.auth.get_user().await?;
                println!("{} <{}> ({})", admin.full_name(), admin.email, admin.account_type.as_str());
            }
            Command::RecoverPassword { mobile } => {
                let confirmation = self.auth.recover_password(&mobile).await?;
                self.snackbar.open(confirmation);
            }
            Command::Stats => {
                let _busy = self.loading.begin();
                let (customers, partners, offers) =
                    tokio::join!(c.get_customers_count(), c.get_partners_count(), c.get_offers_count());
                println!("customers: {}", customers?);
                println!("partners:  {}", partners?);
                println!("offers:    {}", offers?);
            }
            Command::Customers { search, page } => {
                let users = match search {
                    Some(query) => self.search_once(AccountType::Customer, &query).await?,
                    None => c.get_customers().await?,
                };
                print_users(print_page(&users, page));
            }
            Command::Partners { pending, search, page } => {
                let users = match (pending, search) {
                    (_, Some(query)) => self.search_once(AccountType::Partner, &query).await?,
                    (true, None) => c.get_not_approved_partners().await?,
                    (false, None) => c.get_partners().await?,
                };
                let exclusive = c.get_exclusive_partners().await.unwrap_or_else(|e| {
                    log::warn!("Could not load exclusive partners: {}", e);
                    Vec::new()
                });
                for user in print_page(&users, page) {
                    let mark = if filters::is_exclusive(user.id, &exclusive) { " [exclusive]" } else { "" };
                    println!("{}{}", user_line(user), mark);
                }
            }
            Command::Search { partners } => {
                let account_type = if partners { AccountType::Partner } else { AccountType::Customer };
                self.interactive_search(account_type).await?;
            }
            Command::User { id } => {
                let user = match c.get_customer(id).await {
                    Ok(user) => user,
                    Err(_) => c.get_partner(id).await?,
                };
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
            Command::Approve { id } => {
                c.approve_partner(id).await?;
                self.snackbar.open("Partner approved successfully");
            }
            Command::Reject { id } => {
                c.reject_partner(id).await?;
                self.snackbar.open("Partner rejected successfully");
            }
            Command::DeleteUser { id } => {
                c.delete_user(id).await?;
                self.snackbar.open("User deleted successfully");
            }
            Command::ToggleActive { id } => {
                let user = c.toggle_user_active(id).await?;
                let state = if user.active { "activated" } else { "deactivated" };
                self.snackbar.open(format!("User {} {}", id, state));
            }
            Command::Exclusive { id, remove } => {
                if remove {
                    c.remove_partner_exclusive(id).await?;
                    self.snackbar.open("Partner is no longer exclusive");
                } else {
                    c.set_partner_exclusive(id).await?;
                    self.snackbar.open("Partner set as exclusive");
                }
            }
            Command::ToggleSharable { id } => {
                c.toggle_partner_sharable(id).await?;
                self.snackbar.open("Partner updated successfully");
            }
            Command::Branches { partner_id } => {
                for branch in c.get_branches_of_partner(partner_id).await? {
                    println!("{:>5}  {}  {}", branch.id, branch.address, branch.phone);
                }
            }
            Command::Plans => {
                for plan in c.get_plans().await? {
                    println!(
                        "{:>5}  {:<20} {:>8.2}  {} offers{}",
                        plan.id,
                        plan.english_name,
                        plan.price,
                        plan.count_of_offers,
                        if plan.is_default { "  (default)" } else { "" }
                    );
                }
            }
            Command::AddPlan {
                english_name,
                turkish_name,
                price,
                count_of_offers,
                english_description,
                turkish_description,
                image,
                default,
            } => {
                let request = PlanRequest {
                    english_name,
                    turkish_name,
                    english_description,
                    turkish_description,
                    price,
                    count_of_offers,
                    image,
                    is_default: default,
                };
                let plan = c.create_plan(&request).await?;
                self.snackbar.open(format!("Plan {} created successfully", plan.id));
            }
            Command::DeletePlan { plan_id } => {
                c.delete_plan(plan_id).await?;
                self.snackbar.open("Plan deleted successfully");
            }
            Command::PlanCategories { plan_id } => {
                let mut editor = self.editor(plan_id);
                editor.load().await?;
                println!("linked:");
                print_categories(editor.current());
                println!("available:");
                print_categories(editor.available());
            }
            Command::Associate { plan_id, category_ids } => {
                let mut editor = self.editor(plan_id);
                editor.load().await?;
                let mut failures = 0;
                for category_id in category_ids {
                    if editor.add(category_id).await.is_err() {
                        failures += 1;
                    }
                }
                if failures > 0 {
                    anyhow::bail!("{} association(s) failed", failures);
                }
            }
            Command::Disassociate { plan_id, category_id } => {
                let mut editor = self.editor(plan_id);
                editor.load().await?;
                editor.remove(category_id).await?;
            }
            Command::EditPlan {
                plan_id,
                english_name,
                turkish_name,
                price,
                count_of_offers,
                add_categories,
            } => {
                let plan = c
                    .get_plans()
                    .await?
                    .into_iter()
                    .find(|p| p.id == plan_id)
                    .with_context(|| format!("Plan {} not found", plan_id))?;
                let mut request = PlanRequest::from(&plan);
                if let Some(name) = english_name {
                    request.english_name = name;
                }
                if let Some(name) = turkish_name {
                    request.turkish_name = name;
                }
                if let Some(price) = price {
                    request.price = price;
                }
                if let Some(count) = count_of_offers {
                    request.count_of_offers = count;
                }

                let mut editor = self.editor(plan_id);
                if let Err(e) = editor.load().await {
                    log::warn!("Editing plan {} without loaded categories: {}", plan_id, e);
                }
                let outcome = editor.bulk_add_then_update_plan(&add_categories, &request).await;
                for id in &outcome.skipped {
                    log::info!("Category {} skipped", id);
                }
                outcome.plan?;
            }
            Command::UpgradePlan { user_id, plan_id } => {
                let plan = c.admin_upgrade_plan(plan_id, user_id).await?;
                self.snackbar.open(format!("User moved to plan {}", plan.english_name));
            }
            Command::Categories => {
                let mut categories = c.get_categories().await?;
                filters::sort_by_english_name(&mut categories);
                print_categories(&categories);
            }
            Command::AddCategory { english_name, turkish_name } => {
                c.create_category(&english_name, &turkish_name).await?;
                self.snackbar.open("Category created successfully");
            }
            Command::EditCategory { id, english_name, turkish_name } => {
                c.edit_category(id, &english_name, &turkish_name).await?;
                self.snackbar.open("Category edited successfully");
            }
            Command::DeleteCategory { id } => {
                c.delete_category(id).await?;
                self.snackbar.open("Category deleted successfully");
            }
            Command::Cities => {
                let mut cities = c.get_cities().await?;
                filters::sort_by_english_name(&mut cities);
                for city in cities {
                    println!("{:>5}  {} / {}", city.id, city.english_name, city.turkish_name);
                }
            }
            Command::City { id } => {
                let city = c.get_city(id).await?;
                println!("{:>5}  {} / {}", city.id, city.english_name, city.turkish_name);
            }
            Command::AddCity { english_name, turkish_name } => {
                c.create_city(&NameRequest { english_name, turkish_name }).await?;
                self.snackbar.open("City created successfully");
            }
            Command::EditCity { id, english_name, turkish_name } => {
                c.edit_city(id, &NameRequest { english_name, turkish_name }).await?;
                self.snackbar.open("City edited successfully");
            }
            Command::DeleteCity { id } => {
                c.delete_city(id).await?;
                self.snackbar.open("City deleted successfully");
            }
            Command::Offers { customer, partner } => {
                let filter = OfferFilter::new(customer, partner);
                let offers = if filter.is_empty() {
                    c.get_offers().await?
                } else {
                    let offers = match filter.customer_id {
                        Some(customer_id) => c.get_offers_of_customer(customer_id).await?,
                        None => c.get_offers().await?,
                    };
                    filter.apply(offers)
                };
                for offer in offers {
                    println!(
                        "{:>5}  customer {:>5}  partner {:>5}  {:>8.2} - {:>6.2} = {:>8.2}",
                        offer.id, offer.customer_id, offer.partner_id, offer.amount, offer.discount, offer.total
                    );
                }
            }
            Command::Support => {
                let info = c.get_support_info().await?;
                println!("email:  {}", info.email);
                println!("mobile: {}", info.mobile);
            }
            Command::SetSupport { email, mobile } => {
                c.update_support_info(&email, &mobile).await?;
                self.snackbar.open("Support info updated successfully");
            }
            Command::Config { set_api_url } => {
                if let Some(url) = set_api_url {
                    self.config.save_api_url(url)?;
                    self.snackbar.open("Configuration saved");
                }
                let settings = self.config.load_or_default()?;
                println!("config dir:     {}", self.config.config_dir().display());
                println!("api url:        {}", self.client.base_url());
                println!("saved api url:  {}", settings.api_url);
                println!("retry attempts: {}", settings.retry_attempts);
                println!("search quiet:   {} ms", settings.search_quiet_ms);
            }
        }
        Ok(())
    }

    fn editor(&self, plan_id: Id) -> AssociationEditor {
        AssociationEditor::for_client(&self.client, plan_id, self.snackbar.clone(), self.loading.clone())
    }

    async fn search_once(&self, account_type: AccountType, query: &str) -> Result<Vec<User>> {
        let search = UserSearch::new(Arc::new(self.client.clone()), account_type, self.loading.clone());
        Ok(search.search(query).await?.unwrap_or_default())
    }

    /// Reads queries line by line and searches once typing settles.
    async fn interactive_search(&self, account_type: AccountType) -> Result<()> {
        let search = UserSearch::new(Arc::new(self.client.clone()), account_type, self.loading.clone());
        let mut debouncer = Debouncer::new(self.quiet_period);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(query) => debouncer.push(query),
                    None => {
                        input_open = false;
                        debouncer.finish();
                    }
                },
                settled = debouncer.next() => match settled {
                    Some(query) => match search.search(&query).await {
                        Ok(Some(users)) => {
                            println!("-- {} result(s) for {:?}", users.len(), query);
                            print_users(&users);
                        }
                        Ok(None) => {}
                        Err(e) => self.snackbar.error(format!("search failed: {}", e)),
                    },
                    None => break,
                },
            }
            self.flush_notices();
        }
        Ok(())
    }
}

fn user_line(user: &User) -> String {
    format!(
        "{:>5}  {:<24} {:<30} {:<14} {}",
        user.id,
        user.full_name(),
        user.email,
        user.mobile,
        if user.active { "active" } else { "inactive" }
    )
}

/// Slices out one page and prints the page footer to stderr.
fn print_page<T>(items: &[T], page: u64) -> &[T] {
    let pages = filters::page_count(items.len() as u64).max(1);
    eprintln!("page {} of {} ({} total)", page.clamp(1, pages), pages, items.len());
    filters::page(items, page)
}

fn print_users(users: &[User]) {
    for user in users {
        println!("{}", user_line(user));
    }
}

fn print_categories(categories: &[Category]) {
    for category in categories {
        println!("{:>5}  {} / {}", category.id, category.english_name, category.turkish_name);
    }
}
