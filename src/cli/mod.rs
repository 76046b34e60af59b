use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::application::{
    AppError, ClientUpdate, DevisService, QuoteEditor, QuotePreview, ServiceUpdate,
    format_long_date,
};
use crate::domain::{
    CompanyProfileUpdate, DEFAULT_OWNER, DEFAULT_UNIT, InvoiceStatus, ItemField, LineItem,
    QuoteStatus, Session, coerce_amount, format_amount, format_quantity, parse_amount,
};
use crate::storage::QuoteStore;

/// Devispro - quotes and invoices for small businesses
#[derive(Parser)]
#[command(name = "devispro")]
#[command(about = "Draft quotes from a service catalog, track their status and turn them into invoices")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "DEVISPRO_DB", default_value = "devispro.db")]
    pub database: String,

    /// Account the records belong to
    #[arg(long, global = true, env = "DEVISPRO_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Client directory
    #[command(subcommand)]
    Client(ClientCommands),

    /// Service catalog
    #[command(subcommand)]
    Service(ServiceCommands),

    /// Company profile printed on quotes
    #[command(subcommand)]
    Company(CompanyCommands),

    /// Create, edit and track quotes
    #[command(subcommand)]
    Quote(QuoteCommands),

    /// Invoices created from quotes
    #[command(subcommand)]
    Invoice(InvoiceCommands),

    /// Dashboard statistics
    Stats,

    /// Export data to CSV or JSON
    Export {
        /// What to export: quotes, invoices, services, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data from CSV
    Import {
        /// What to import: services
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate rows without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip services that already exist
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Add a client
    Add {
        /// Client name (must be unique)
        name: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,
    },

    /// List all clients
    List,

    /// Show a client
    Show { name: String },

    /// Change client details
    Update {
        name: String,

        /// New name
        #[arg(long = "name")]
        new_name: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete a client (existing quotes keep their copy of the details)
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Add a service to the catalog
    Add {
        /// Service name (must be unique)
        name: String,

        /// Unit price excluding tax (e.g. "450" or "45,50")
        price: String,

        /// Billing unit (e.g. heure, jour, forfait)
        #[arg(short, long)]
        unit: Option<String>,

        /// VAT rate in percent
        #[arg(short, long)]
        tva: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List the catalog
    List,

    /// Show a service
    Show { name: String },

    /// Change a catalog entry
    Update {
        name: String,

        /// New name
        #[arg(long = "name")]
        new_name: Option<String>,

        #[arg(short, long)]
        unit: Option<String>,

        #[arg(short, long)]
        price: Option<String>,

        #[arg(short, long)]
        tva: Option<String>,

        /// Description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a service from the catalog
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// Show the company profile
    Show,

    /// Change company profile fields
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        legal_status: Option<String>,
        #[arg(long)]
        siren: Option<String>,
        #[arg(long)]
        vat_number: Option<String>,
        #[arg(long)]
        bank_name: Option<String>,
        #[arg(long)]
        iban: Option<String>,
        #[arg(long)]
        bic: Option<String>,
    },
}

/// Changes applied to a quote draft before it is saved.
#[derive(Args)]
pub struct QuoteEditArgs {
    /// Client name from the directory
    #[arg(short, long)]
    pub client: Option<String>,

    /// Add a line from the catalog (repeatable)
    #[arg(short, long = "service")]
    pub services: Vec<String>,

    /// Add a manual line: "name;quantity;unit;price_ht[;tva_rate]" (repeatable)
    #[arg(short, long = "item")]
    pub items: Vec<String>,

    /// Change one field of a line: "LINE:FIELD=VALUE", e.g. "2:quantity=3" (repeatable)
    #[arg(long = "set")]
    pub updates: Vec<String>,

    /// Remove a line by number, starting at 1 (repeatable)
    #[arg(long = "remove")]
    pub removals: Vec<usize>,

    /// Discount in euros, deducted from the pre-tax subtotal
    #[arg(long)]
    pub discount: Option<String>,

    /// Expiration date (YYYY-MM-DD)
    #[arg(long)]
    pub expires: Option<String>,

    /// Event date (YYYY-MM-DD)
    #[arg(long)]
    pub event: Option<String>,

    /// Remove the event date
    #[arg(long, conflicts_with = "event")]
    pub clear_event: bool,

    #[arg(long)]
    pub notes: Option<String>,

    /// Show the preview without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum QuoteCommands {
    /// Compose a new quote and save it
    New(QuoteEditArgs),

    /// Change a saved quote
    Edit {
        /// Quote number (e.g. D-2024-001)
        number: String,

        #[command(flatten)]
        args: QuoteEditArgs,
    },

    /// List quotes, newest first
    List {
        /// Filter by status: brouillon, envoyé, accepté, refusé
        #[arg(long)]
        status: Option<String>,
    },

    /// Print a quote
    Show { number: String },

    /// Move a quote to another status
    Status {
        number: String,

        /// brouillon, envoyé, accepté, refusé (English names accepted)
        status: String,
    },

    /// Delete a quote
    Delete { number: String },

    /// Create the invoice for a quote
    Invoice { number: String },
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// List invoices, newest first
    List {
        /// Filter by status: en attente, payée, annulée
        #[arg(long)]
        status: Option<String>,
    },

    /// Show an invoice
    Show { number: String },

    /// Change an invoice status
    Status {
        number: String,

        /// en attente, payée, annulée (English names accepted)
        status: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);
        let session = Session::new(self.owner.clone());

        match self.command {
            Commands::Init => {
                DevisService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Client(cmd) => {
                let service = DevisService::connect(&self.database).await?;
                run_client_command(&service, &session, cmd).await?;
            }

            Commands::Service(cmd) => {
                let service = DevisService::connect(&self.database).await?;
                run_service_command(&service, &session, cmd).await?;
            }

            Commands::Company(cmd) => {
                let service = DevisService::connect(&self.database).await?;
                run_company_command(&service, &session, cmd).await?;
            }

            Commands::Quote(cmd) => {
                let service = DevisService::connect(&self.database).await?;
                run_quote_command(&service, &session, cmd).await?;
            }

            Commands::Invoice(cmd) => {
                let service = DevisService::connect(&self.database).await?;
                run_invoice_command(&service, &session, cmd).await?;
            }

            Commands::Stats => {
                let service = DevisService::connect(&self.database).await?;
                run_stats_command(&service, &session).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = DevisService::connect(&self.database).await?;
                run_export_command(&service, &session, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = DevisService::connect(&self.database).await?;
                run_import_command(
                    &service,
                    &session,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                )
                .await?;
            }
        }

        Ok(())
    }
}

/// Logs go to stderr so command output stays clean.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "devispro=debug" } else { "devispro=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn run_client_command(
    service: &DevisService,
    session: &Session,
    cmd: ClientCommands,
) -> Result<()> {
    match cmd {
        ClientCommands::Add {
            name,
            address,
            email,
            phone,
        } => {
            let client = service
                .create_client(session, name, address, email, phone)
                .await?;
            println!("Created client: {}", client.name);
        }

        ClientCommands::List => {
            let clients = service.list_clients(session).await?;
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<25} {:<30} {:<15}", "NAME", "EMAIL", "PHONE");
                println!("{}", "-".repeat(72));
                for client in clients {
                    println!(
                        "{:<25} {:<30} {:<15}",
                        truncate(&client.name, 25),
                        truncate(&client.email, 30),
                        client.phone
                    );
                }
            }
        }

        ClientCommands::Show { name } => {
            let client = service.get_client(session, &name).await?;
            println!("Client: {}", client.name);
            println!("  ID:       {}", client.id);
            if !client.email.is_empty() {
                println!("  Email:    {}", client.email);
            }
            if !client.phone.is_empty() {
                println!("  Phone:    {}", client.phone);
            }
            for (i, line) in client.address.lines().enumerate() {
                let label = if i == 0 { "Address:" } else { "" };
                println!("  {:<9} {}", label, line);
            }
            println!(
                "  Created:  {}",
                client.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        ClientCommands::Update {
            name,
            new_name,
            address,
            email,
            phone,
        } => {
            let update = ClientUpdate {
                name: new_name,
                address,
                email,
                phone,
            };
            let client = service.update_client(session, &name, update).await?;
            println!("Updated client: {}", client.name);
        }

        ClientCommands::Delete { name } => {
            service.delete_client(session, &name).await?;
            println!("Deleted client: {}", name);
        }
    }
    Ok(())
}

async fn run_service_command(
    service: &DevisService,
    session: &Session,
    cmd: ServiceCommands,
) -> Result<()> {
    match cmd {
        ServiceCommands::Add {
            name,
            price,
            unit,
            tva,
            description,
        } => {
            let price = parse_amount(&price).context("Invalid price. Use '450' or '45,50'")?;
            let tva = tva
                .map(|t| parse_amount(&t))
                .transpose()
                .context("Invalid VAT rate")?;

            let entry = service
                .create_service(session, name, price, unit, tva, description)
                .await?;
            println!(
                "Added service: {} ({} / {}, TVA {}%)",
                entry.name,
                format_amount(entry.price_excl_tax),
                entry.unit,
                format_quantity(entry.tax_rate_percent)
            );
        }

        ServiceCommands::List => {
            let services = service.list_services(session).await?;
            if services.is_empty() {
                println!("No services found.");
            } else {
                println!(
                    "{:<30} {:<10} {:>12} {:>6}",
                    "NAME", "UNIT", "PRICE HT", "TVA"
                );
                println!("{}", "-".repeat(61));
                for entry in services {
                    println!(
                        "{:<30} {:<10} {:>12} {:>5}%",
                        truncate(&entry.name, 30),
                        truncate(&entry.unit, 10),
                        format_amount(entry.price_excl_tax),
                        format_quantity(entry.tax_rate_percent)
                    );
                }
            }
        }

        ServiceCommands::Show { name } => {
            let entry = service.get_service(session, &name).await?;
            println!("Service: {}", entry.name);
            println!("  ID:        {}", entry.id);
            println!("  Unit:      {}", entry.unit);
            println!("  Price HT:  {}", format_amount(entry.price_excl_tax));
            println!("  TVA:       {}%", format_quantity(entry.tax_rate_percent));
            if let Some(desc) = &entry.description {
                println!("  Details:   {}", desc);
            }
        }

        ServiceCommands::Update {
            name,
            new_name,
            unit,
            price,
            tva,
            description,
        } => {
            let update = ServiceUpdate {
                name: new_name,
                unit,
                price_excl_tax: price
                    .map(|p| parse_amount(&p))
                    .transpose()
                    .context("Invalid price")?,
                tax_rate_percent: tva
                    .map(|t| parse_amount(&t))
                    .transpose()
                    .context("Invalid VAT rate")?,
                description,
            };
            let entry = service.update_service(session, &name, update).await?;
            println!("Updated service: {}", entry.name);
        }

        ServiceCommands::Delete { name } => {
            service.delete_service(session, &name).await?;
            println!("Deleted service: {}", name);
        }
    }
    Ok(())
}

async fn run_company_command(
    service: &DevisService,
    session: &Session,
    cmd: CompanyCommands,
) -> Result<()> {
    let profile = match cmd {
        CompanyCommands::Show => service.company(session).await?,
        CompanyCommands::Set {
            name,
            address,
            email,
            phone,
            legal_status,
            siren,
            vat_number,
            bank_name,
            iban,
            bic,
        } => {
            let update = CompanyProfileUpdate {
                name,
                address,
                email,
                phone,
                legal_status,
                siren,
                vat_number,
                bank_name,
                iban,
                bic,
            };
            let profile = service.update_company(session, update).await?;
            println!("Company profile saved.");
            profile
        }
    };

    println!("{}", profile.name);
    println!("  Address:       {}", profile.address.replace('\n', ", "));
    println!("  Email:         {}", profile.email);
    println!("  Phone:         {}", profile.phone);
    println!("  Legal status:  {}", profile.legal_status);
    println!("  SIREN:         {}", profile.siren);
    println!("  VAT number:    {}", profile.vat_number);
    println!("  Bank:          {}", profile.bank_name);
    println!("  IBAN:          {}", profile.iban);
    println!("  BIC:           {}", profile.bic);
    Ok(())
}

async fn run_quote_command(
    service: &DevisService,
    session: &Session,
    cmd: QuoteCommands,
) -> Result<()> {
    match cmd {
        QuoteCommands::New(args) => {
            let mut editor = service.new_quote(session, today()).await?;
            let dry_run = args.dry_run;
            apply_quote_edits(&mut editor, args)?;
            finish_quote_edit(&mut editor, dry_run).await?;
        }

        QuoteCommands::Edit { number, args } => {
            let mut editor = service.edit_quote(session, &number, today()).await?;
            let dry_run = args.dry_run;
            apply_quote_edits(&mut editor, args)?;
            finish_quote_edit(&mut editor, dry_run).await?;
        }

        QuoteCommands::List { status } => {
            let status = status.as_deref().map(parse_quote_status).transpose()?;
            let quotes = service.list_quotes(session, status).await?;

            if quotes.is_empty() {
                println!("No quotes found.");
            } else {
                println!(
                    "{:<14} {:<10} {:<25} {:<12} {:>14}",
                    "NUMBER", "STATUS", "CLIENT", "DATE", "TOTAL TTC"
                );
                println!("{}", "-".repeat(79));
                for quote in quotes {
                    println!(
                        "{:<14} {:<10} {:<25} {:<12} {:>14}",
                        quote.number,
                        quote.status,
                        truncate(&quote.client.name, 25),
                        quote.emission_date,
                        format_amount(quote.totals.total_incl_tax)
                    );
                }
            }
        }

        QuoteCommands::Show { number } => {
            let quote = service.get_quote(session, &number).await?;
            let company = service.company(session).await?;

            println!("{}", QuotePreview::from_quote(&quote, &company));
            println!();
            println!("Status: {}", quote.status);
            if let Some(sent) = quote.sent_at {
                println!("Sent:   {}", sent.format("%Y-%m-%d %H:%M"));
            }
        }

        QuoteCommands::Status { number, status } => {
            let status = parse_quote_status(&status)?;
            let quote = service.set_quote_status(session, &number, status).await?;
            println!("Quote {} is now {}", quote.number, quote.status);
        }

        QuoteCommands::Delete { number } => {
            service.delete_quote(session, &number).await?;
            println!("Deleted quote: {}", number);
        }

        QuoteCommands::Invoice { number } => {
            let invoice = service.convert_to_invoice(session, &number, today()).await?;
            println!(
                "Created invoice {} from quote {}: {} due {}",
                invoice.number,
                number,
                format_amount(invoice.totals.total_incl_tax),
                format_long_date(invoice.due_date)
            );
        }
    }
    Ok(())
}

/// Apply command-line changes to the draft in a fixed order: client,
/// removals (highest line first), field updates, catalog lines, manual
/// lines, then discount, dates and notes.
fn apply_quote_edits<S: QuoteStore + ?Sized>(
    editor: &mut QuoteEditor<'_, S>,
    args: QuoteEditArgs,
) -> Result<()> {
    if let Some(name) = args.client {
        let client_id = editor
            .find_client(&name)
            .map(|c| c.id)
            .ok_or(AppError::ClientNotFound(name))?;
        editor.select_client(client_id)?;
    }

    let mut removals = args.removals;
    removals.sort_unstable();
    removals.dedup();
    for line in removals.into_iter().rev() {
        let index = line
            .checked_sub(1)
            .context("Line numbers start at 1")?;
        editor.draft_mut().remove_item(index)?;
    }

    for spec in &args.updates {
        let (index, field, value) = parse_line_update(spec)?;
        editor
            .draft_mut()
            .update_item_from_input(index, field, &value)?;
    }

    for name in args.services {
        let service_id = editor
            .find_service(&name)
            .map(|s| s.id)
            .ok_or(AppError::ServiceNotFound(name))?;
        editor.add_catalog_service(service_id)?;
    }

    for spec in &args.items {
        editor.draft_mut().add_item(parse_item_spec(spec)?);
    }

    if let Some(discount) = args.discount {
        check_discount_input(&discount)?;
        editor.draft_mut().set_discount_from_input(&discount);
    }
    if let Some(date) = args.expires {
        editor.draft_mut().set_expiration_date(parse_date(&date)?);
    }
    if let Some(date) = args.event {
        editor.draft_mut().set_event_date(Some(parse_date(&date)?));
    }
    if args.clear_event {
        editor.draft_mut().set_event_date(None);
    }
    if let Some(notes) = args.notes {
        editor.draft_mut().set_notes(notes);
    }
    Ok(())
}

async fn finish_quote_edit<S: QuoteStore + ?Sized>(
    editor: &mut QuoteEditor<'_, S>,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        println!("{}", editor.preview());
        println!();
        println!("(not saved)");
        return Ok(());
    }

    let creating = !editor.is_editing();
    let quote = editor.save().await?;
    println!("{}", editor.preview());
    println!();
    if creating {
        println!("Created quote {}", quote.number);
    } else {
        println!("Updated quote {}", quote.number);
    }
    Ok(())
}

async fn run_invoice_command(
    service: &DevisService,
    session: &Session,
    cmd: InvoiceCommands,
) -> Result<()> {
    match cmd {
        InvoiceCommands::List { status } => {
            let status = status.as_deref().map(parse_invoice_status).transpose()?;
            let invoices = service.list_invoices(session, status).await?;
            let today = today();

            if invoices.is_empty() {
                println!("No invoices found.");
            } else {
                println!(
                    "{:<14} {:<11} {:<25} {:<12} {:>14}",
                    "NUMBER", "STATUS", "CLIENT", "DUE", "TOTAL TTC"
                );
                println!("{}", "-".repeat(80));
                for invoice in invoices {
                    let overdue = if invoice.is_overdue(today) { " (overdue)" } else { "" };
                    println!(
                        "{:<14} {:<11} {:<25} {:<12} {:>14}{}",
                        invoice.number,
                        invoice.status,
                        truncate(&invoice.client.name, 25),
                        invoice.due_date,
                        format_amount(invoice.totals.total_incl_tax),
                        overdue
                    );
                }
            }
        }

        InvoiceCommands::Show { number } => {
            let invoice = service.get_invoice(session, &number).await?;

            println!("Invoice: {}", invoice.number);
            println!("  Status:   {}", invoice.status);
            println!("  Client:   {}", invoice.client.name);
            println!("  Issued:   {}", format_long_date(invoice.emission_date));
            println!("  Due:      {}", format_long_date(invoice.due_date));
            if invoice.is_overdue(today()) {
                println!("  (overdue)");
            }
            println!();
            for item in &invoice.items {
                println!(
                    "  {:<30} {:>6} {:<9} x {:>12}  TVA {:>4}%",
                    truncate(&item.service_name, 30),
                    format_quantity(item.quantity),
                    truncate(&item.unit, 9),
                    format_amount(item.unit_price_excl_tax),
                    format_quantity(item.tax_rate_percent)
                );
            }
            println!();
            if !invoice.discount.is_zero() {
                println!("  Discount:   -{}", format_amount(invoice.discount));
            }
            println!("  Total HT:   {}", format_amount(invoice.totals.subtotal_excl_tax));
            println!("  TVA:        {}", format_amount(invoice.totals.total_tax));
            println!("  Total TTC:  {}", format_amount(invoice.totals.total_incl_tax));
        }

        InvoiceCommands::Status { number, status } => {
            let status = parse_invoice_status(&status)?;
            let invoice = service.set_invoice_status(session, &number, status).await?;
            println!("Invoice {} is now {}", invoice.number, invoice.status);
        }
    }
    Ok(())
}

async fn run_stats_command(service: &DevisService, session: &Session) -> Result<()> {
    let stats = service.dashboard_stats(session).await?;

    println!("Quotes:          {}", stats.total_quotes);
    println!("  brouillon:     {}", stats.draft_quotes);
    println!("  envoyé:        {}", stats.sent_quotes);
    println!("  accepté:       {}", stats.accepted_quotes);
    println!("  refusé:        {}", stats.refused_quotes);
    println!("Conversion rate: {:.1}%", stats.conversion_rate);
    println!();
    println!("Invoices:        {}", stats.total_invoices);
    println!("  en attente:    {}", stats.pending_invoices);
    println!("  payée:         {}", stats.paid_invoices);
    println!("Revenue (TTC):   {}", format_amount(stats.revenue));
    println!();
    println!("Clients:         {}", stats.total_clients);
    println!("Services:        {}", stats.total_services);
    Ok(())
}

async fn run_export_command(
    service: &DevisService,
    session: &Session,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service, session);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match export_type {
        "quotes" => exporter.export_quotes_csv(writer).await?,
        "invoices" => exporter.export_invoices_csv(writer).await?,
        "services" => exporter.export_services_csv(writer).await?,
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            snapshot.quotes.len() + snapshot.invoices.len()
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: quotes, invoices, services, full",
                export_type
            );
        }
    };

    if let Some(path) = output {
        eprintln!("Exported {} record(s) to {}", count, path);
    }
    Ok(())
}

async fn run_import_command(
    service: &DevisService,
    session: &Session,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service, session);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = match import_type {
        "services" => importer.import_services_csv(reader, options).await?,
        _ => {
            anyhow::bail!("Invalid import type '{}'. Valid types: services", import_type);
        }
    };

    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            let field = error
                .field
                .as_ref()
                .map(|f| format!("{}: ", f))
                .unwrap_or_default();
            println!("  Line {}: {}{}", error.line, field, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_quote_status(s: &str) -> Result<QuoteStatus> {
    QuoteStatus::from_str(s).ok_or_else(|| AppError::InvalidStatus(s.to_string()).into())
}

fn parse_invoice_status(s: &str) -> Result<InvoiceStatus> {
    InvoiceStatus::from_str(s).ok_or_else(|| AppError::InvalidStatus(s.to_string()).into())
}

/// "name;quantity;unit;price_ht[;tva_rate]". Empty unit means the default unit.
/// Numbers are read like form input: anything unparseable becomes zero.
fn parse_item_spec(spec: &str) -> Result<LineItem> {
    let parts: Vec<&str> = spec.split(';').map(str::trim).collect();
    if !(4..=5).contains(&parts.len()) {
        anyhow::bail!(
            "Invalid item '{}'. Use \"name;quantity;unit;price_ht[;tva_rate]\"",
            spec
        );
    }

    let unit = if parts[2].is_empty() { DEFAULT_UNIT } else { parts[2] };
    let rate = parts.get(4).map_or(rust_decimal::Decimal::ZERO, |rate| coerce_amount(rate));

    Ok(LineItem::new(
        parts[0],
        coerce_amount(parts[1]),
        unit,
        coerce_amount(parts[3]),
        rate,
    ))
}

/// Only a readable negative discount is refused; anything else is coerced.
fn check_discount_input(raw: &str) -> Result<()> {
    let amount = coerce_amount(raw);
    if amount.is_sign_negative() && !amount.is_zero() {
        anyhow::bail!("Discount cannot be negative: {}", raw);
    }
    Ok(())
}

/// "LINE:FIELD=VALUE" with LINE starting at 1. Returns the zero-based index.
fn parse_line_update(spec: &str) -> Result<(usize, ItemField, String)> {
    let (line, rest) = spec
        .split_once(':')
        .with_context(|| format!("Invalid update '{}'. Use LINE:FIELD=VALUE", spec))?;
    let (field, value) = rest
        .split_once('=')
        .with_context(|| format!("Invalid update '{}'. Use LINE:FIELD=VALUE", spec))?;

    let line: usize = line
        .trim()
        .parse()
        .with_context(|| format!("Invalid line number in '{}'", spec))?;
    let index = line.checked_sub(1).context("Line numbers start at 1")?;
    let field: ItemField = field.trim().parse().map_err(anyhow::Error::msg)?;

    Ok((index, field, value.to_string()))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}
