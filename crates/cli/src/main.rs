use anyhow::{bail, Context};
use api_shared::{NewAppointmentRes, PatientRes, RegistrationFormRes, UserRes};
use carepulse_core::form::{registration_layout, UploadedFile};
use carepulse_core::{
    load_new_appointment, CoreConfig, FormController, LocalStore, NewUser,
    PatientActions, PatientFormValues, RegistrationSubmitter, Route, ShardableUuid, SubmitOutcome,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "carepulse")]
#[command(about = "CarePulse patient registration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered patients
    List {
        /// List user accounts instead
        #[arg(long)]
        users: bool,
    },
    /// Create a user account (returns the existing one for a known email)
    CreateUser {
        /// Full name
        name: String,
        /// Email address
        email: String,
        /// Phone number in international format
        phone: String,
    },
    /// Register a user as a patient from a YAML file of form values
    Register {
        /// User id (32 hex characters)
        user_id: String,
        /// YAML file with camelCase form values
        values: PathBuf,
        /// Identification document to upload
        #[arg(long)]
        document: Option<PathBuf>,
        /// MIME type of the document (sniffed from content when omitted)
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Show the patient registered by a user
    Patient {
        /// User id (32 hex characters)
        user_id: String,
    },
    /// Show the new-appointment page data for a user
    NewAppointment {
        /// User id (32 hex characters)
        user_id: String,
    },
    /// Print the registration form with its default values
    Form,
}

/// Prints where the pipeline navigates to.
struct PrintNavigator;

impl carepulse_core::Navigator for PrintNavigator {
    fn push(&self, route: &Route) {
        println!("Next: {route}");
    }
}

fn parse_user_id(raw: &str) -> anyhow::Result<ShardableUuid> {
    ShardableUuid::parse(raw).with_context(|| format!("invalid user id '{raw}'"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_values(path: &Path) -> anyhow::Result<PatientFormValues> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading form values from {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_document(path: &Path, mime_type: Option<String>) -> anyhow::Result<UploadedFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading document {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("document path has no file name: {}", path.display()))?;
    Ok(UploadedFile {
        bytes,
        file_name,
        mime_type: mime_type.unwrap_or_default(),
    })
}

async fn register(
    store: Arc<LocalStore>,
    user_id: &str,
    values: &Path,
    document: Option<PathBuf>,
    mime_type: Option<String>,
) -> anyhow::Result<()> {
    let user_id = parse_user_id(user_id)?;
    let Some(user) = store.get_user(&user_id).await? else {
        bail!("user {user_id} not found");
    };

    let mut form = FormController::with_values(store.config().catalog(), load_values(values)?);
    if let Some(path) = document {
        form.set_document(Some(load_document(&path, mime_type)?))?;
    }

    let submitter = RegistrationSubmitter::new(store.clone(), PrintNavigator);
    match submitter.submit(&mut form, &user).await {
        SubmitOutcome::Navigated(_) => {
            if let Some(patient) = store.get_patient(&user.id).await? {
                print_json(&PatientRes::from(patient))?;
            }
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("{field}: {message}");
            }
            bail!("registration form has {} invalid field(s)", errors.len())
        }
        SubmitOutcome::AlreadyRegistered { message } | SubmitOutcome::Failed { message } => {
            bail!(message)
        }
        SubmitOutcome::Ignored => bail!("a registration is already in progress"),
    }
}

async fn run(command: Commands, store: Arc<LocalStore>) -> anyhow::Result<()> {
    match command {
        Commands::List { users: true } => {
            let users = store.list_users();
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users {
                println!(
                    "ID: {}, Name: {}, Email: {}, Created: {}",
                    user.id,
                    user.name,
                    user.email,
                    user.created_at.to_rfc3339()
                );
            }
        }
        Commands::List { users: false } => {
            let patients = store.list_patients();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "ID: {}, User: {}, Name: {}, Physician: {}, Updated: {}",
                    patient.id,
                    patient.user_id,
                    patient.name,
                    patient.primary_physician,
                    patient
                        .last_updated
                        .map(|dt| dt.to_rfc3339())
                        .unwrap_or_default()
                );
            }
        }
        Commands::CreateUser { name, email, phone } => {
            let validated = match (NewUser { name, email, phone }).validate() {
                Ok(validated) => validated,
                Err(errors) => {
                    for (field, message) in errors.iter() {
                        eprintln!("{field}: {message}");
                    }
                    bail!("invalid user details");
                }
            };
            let user = store.create_user(validated).await?;
            print_json(&UserRes::from(user))?;
        }
        Commands::Register {
            user_id,
            values,
            document,
            mime_type,
        } => register(store, &user_id, &values, document, mime_type).await?,
        Commands::Patient { user_id } => {
            let user_id = parse_user_id(&user_id)?;
            match store.get_patient(&user_id).await? {
                Some(patient) => print_json(&PatientRes::from(patient))?,
                None => bail!("no patient registered for user {user_id}"),
            }
        }
        Commands::NewAppointment { user_id } => {
            let user_id = parse_user_id(&user_id)?;
            let view = load_new_appointment(store.as_ref(), &user_id).await?;
            print_json(&NewAppointmentRes::from(view))?;
        }
        Commands::Form => {
            let catalog = store.config().catalog();
            let form = FormController::new(catalog);
            let sections = registration_layout(catalog)
                .iter()
                .map(|section| section.render(&form, false))
                .collect();
            print_json(&RegistrationFormRes::new(sections))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("No command given. Use --help for usage.");
        return Ok(());
    };

    let store = Arc::new(LocalStore::new(Arc::new(CoreConfig::from_env()?)));
    run(command, store).await
}
