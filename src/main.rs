use clap::{Parser, Subcommand};
use silque::store::{APPS_FILE, CERTIFICATES_FILE, SOURCES_FILE};
use silque::{
    download_ipa, fetch_repository, find_icon_path, load_icon, AccentColor, AppItem,
    CertificatePair, JsonStore, Result, Settings, SigningSession, SilqueError, SourceItem,
    StoredItem,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "silque")]
#[command(about = "Import, edit and sign iOS apps, and browse AltStore repositories")]
#[command(version)]
struct Cli {
    /// Directory holding sources, certificates, apps and settings
    #[arg(long, global = true, env = "SILQUE_DATA_DIR", default_value = ".silque")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an ipa, apply edits and record a signing task
    Sign {
        /// The .ipa to import
        input: PathBuf,

        /// Certificate name to sign with
        #[arg(short, long)]
        cert: String,

        /// New display name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// New bundle id
        #[arg(short = 'b', long)]
        bundle_id: Option<String>,

        /// Image to use as the app icon
        #[arg(short = 'k', long)]
        icon: Option<PathBuf>,

        /// Keep the edited bundle on disk and print its location
        #[arg(long)]
        keep: bool,
    },

    /// Show the name, bundle id and icon of an ipa
    Inspect {
        /// The .ipa to inspect
        input: PathBuf,
    },

    /// Fetch a repository and list its apps
    Catalog {
        /// Repository URL
        url: String,

        /// Download the latest version of the app with this bundle id
        #[arg(short, long)]
        download: Option<String>,

        /// Directory for downloads
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Manage repository sources
    Sources {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Manage certificate pairs
    Certs {
        #[command(subcommand)]
        action: CertAction,
    },

    /// Manage app shortcuts
    Apps {
        #[command(subcommand)]
        action: AppAction,
    },

    /// Show or change the accent color
    Accent {
        /// New color as #RRGGBB
        hex: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SourceAction {
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    Add {
        name: String,
        url: String,
    },
    Remove {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum CertAction {
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    Add {
        p12: PathBuf,
        mobileprovision: PathBuf,
    },
    Remove {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum AppAction {
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
    },
    Remove {
        id: Uuid,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("[!] {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = JsonStore::new(&cli.data_dir);

    match cli.command {
        Commands::Sign {
            input,
            cert,
            name,
            bundle_id,
            icon,
            keep,
        } => run_sign(&store, input, cert, name, bundle_id, icon, keep),
        Commands::Inspect { input } => run_inspect(input),
        Commands::Catalog { url, download, out } => run_catalog(&url, download, out),
        Commands::Sources { action } => match action {
            SourceAction::List { search } => {
                print_list(&store.load_sources(), search.as_deref(), |s| {
                    format!("{}  {}", s.name, s.url)
                });
                Ok(())
            }
            SourceAction::Add { name, url } => {
                let item = SourceItem::new(&name, &url)?;
                println!("[*] added source {} ({})", item.name, item.id);
                store.prepend(SOURCES_FILE, item)
            }
            SourceAction::Remove { id } => remove_item::<SourceItem>(&store, SOURCES_FILE, id),
        },
        Commands::Certs { action } => match action {
            CertAction::List { search } => {
                print_list(&store.load_certificates(), search.as_deref(), |c| {
                    format!(
                        "{}  {} + {}",
                        c.display_name(),
                        c.p12_path.display(),
                        c.mobileprovision_path.display()
                    )
                });
                Ok(())
            }
            CertAction::Add {
                p12,
                mobileprovision,
            } => {
                let pair = CertificatePair::new(&p12, &mobileprovision)?;
                println!("[*] added certificate {} ({})", pair.display_name(), pair.id);
                store.prepend(CERTIFICATES_FILE, pair)
            }
            CertAction::Remove { id } => {
                remove_item::<CertificatePair>(&store, CERTIFICATES_FILE, id)
            }
        },
        Commands::Apps { action } => match action {
            AppAction::List { search } => {
                print_list(&store.load_apps(), search.as_deref(), |a| {
                    format!("{}  [{}]", a.name, a.icon)
                });
                Ok(())
            }
            AppAction::Add { name, icon } => {
                let item = AppItem::new(&name, icon.as_deref())?;
                println!("[*] added app {} ({})", item.name, item.id);
                store.prepend(APPS_FILE, item)
            }
            AppAction::Remove { id } => remove_item::<AppItem>(&store, APPS_FILE, id),
        },
        Commands::Accent { hex } => {
            let mut settings = Settings::load(&cli.data_dir);
            if let Some(hex) = hex {
                settings.accent_color = AccentColor::from_hex(&hex);
                settings.save()?;
                println!("[*] accent color set to {}", settings.accent_color);
            } else {
                println!("{}", settings.accent_color);
            }
            Ok(())
        }
    }
}

fn print_list<T: StoredItem>(items: &[T], search: Option<&str>, describe: impl Fn(&T) -> String) {
    let shown: Vec<&T> = items
        .iter()
        .filter(|i| search.map(|q| i.matches(q)).unwrap_or(true))
        .collect();
    if shown.is_empty() {
        println!("[*] nothing to show");
        return;
    }
    for item in shown {
        println!("{}  {}", item.id(), describe(item));
    }
}

fn remove_item<T: StoredItem>(store: &JsonStore, file: &str, id: Uuid) -> Result<()> {
    if store.remove::<T>(file, id)? {
        println!("[*] removed {}", id);
        Ok(())
    } else {
        Err(SilqueError::InvalidInput(format!("no entry with id {}", id)))
    }
}

fn run_sign(
    store: &JsonStore,
    input: PathBuf,
    cert: String,
    name: Option<String>,
    bundle_id: Option<String>,
    icon: Option<PathBuf>,
    keep: bool,
) -> Result<()> {
    if let Some(ref k) = icon {
        if !k.is_file() {
            return Err(SilqueError::FileNotFound(k.clone()));
        }
    }

    let known = store.load_certificates();
    if !known.is_empty() && !known.iter().any(|c| c.display_name() == cert) {
        println!("[?] certificate \"{}\" is not in the certificate list", cert);
    }

    let mut session = SigningSession::new();
    session.set_keep_output(keep);

    println!("[*] extracting...");
    session.import(&input)?;
    println!(
        "[*] imported \"{}\" ({})",
        session.display_name().unwrap_or_default(),
        session.bundle_id().unwrap_or_default()
    );

    // Edit failures are reported and the remaining edits still run.
    if let Some(ref n) = name {
        match session.set_display_name(n) {
            Ok(()) => println!("[*] changed name to \"{}\"", n),
            Err(_) => println!("[!] {}", session.status_message()),
        }
    }
    if let Some(ref b) = bundle_id {
        match session.set_bundle_id(b) {
            Ok(()) => println!("[*] changed bundle id to \"{}\"", b),
            Err(_) => println!("[!] {}", session.status_message()),
        }
    }
    if let Some(ref k) = icon {
        let report = session.set_icon(load_icon(k)?)?;
        for (file, reason) in report.failed() {
            println!("[!] could not write {}: {}", file, reason);
        }
        println!("[*] {}", report);
    }

    session.select_certificate(&cert);
    let task = session.submit()?;
    println!(
        "[*] {}  {}  cert: {}  {}",
        task.id, task.ipa_name, task.certificate, task.status
    );
    if let Some(out) = session.last_output() {
        println!("[*] edited bundle kept in {}", out.display());
    }

    Ok(())
}

fn run_inspect(input: PathBuf) -> Result<()> {
    let mut session = SigningSession::new();
    session.import(&input)?;

    println!("name:      {}", session.display_name().unwrap_or_default());
    println!("bundle id: {}", session.bundle_id().unwrap_or_default());
    if let Some(bundle) = session.bundle() {
        println!("bundle:    {}", bundle.app_name());
        match find_icon_path(bundle.app_path()) {
            Some(p) => {
                let file = p.file_name().map(|f| f.to_string_lossy().into_owned());
                let dims = session
                    .current_icon()
                    .map(|i| format!(" ({}x{})", i.width(), i.height()))
                    .unwrap_or_default();
                println!("icon:      {}{}", file.unwrap_or_default(), dims);
            }
            None => println!("icon:      none"),
        }
    }

    session.cancel();
    Ok(())
}

fn run_catalog(url: &str, download: Option<String>, out: PathBuf) -> Result<()> {
    let repo = fetch_repository(url)?;
    println!("[*] {} ({} apps)", repo.name, repo.apps.len());

    match download {
        Some(bundle_id) => {
            let app = repo.find_app(&bundle_id).ok_or_else(|| {
                SilqueError::InvalidInput(format!("{} is not in {}", bundle_id, repo.name))
            })?;
            println!("[*] downloading {}...", app.name);
            let path = download_ipa(app, &out)?;
            println!("[*] done: {}", path.display());
        }
        None => {
            for app in &repo.apps {
                let version = app
                    .latest_version()
                    .map(|v| v.version.as_str())
                    .unwrap_or("-");
                println!("{}  {}  {}", app.bundle_identifier, app.name, version);
            }
        }
    }

    Ok(())
}
