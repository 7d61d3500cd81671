use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::macros::date;

use tesouraria::{
    category::create_category,
    church::{TenantContext, create_church},
    entry::{EntryBuilder, PaymentMethod, create_entry},
    initialize_db,
    reserve_fund::deposit,
    side::LedgerSide,
    user::create_user,
};

/// A utility for creating a test database for the REST API server of tesouraria.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test church and user...");

    let church = create_church("Igreja Central", &conn)?;
    let password_hash = bcrypt::hash("test", bcrypt::DEFAULT_COST)?;
    let user = create_user("test@test.com", &password_hash, church.id, &conn)?;

    let context = TenantContext {
        church_id: church.id,
        user_id: user.id,
    };

    println!("Creating categories and ledger entries...");

    let tithes = create_category(
        LedgerSide::Revenue,
        church.id,
        "Dízimos",
        None,
        Some("#22C55E"),
        &conn,
    )?;
    let offerings = create_category(
        LedgerSide::Revenue,
        church.id,
        "Ofertas",
        None,
        Some("#A855F7"),
        &conn,
    )?;
    let utilities = create_category(
        LedgerSide::Expense,
        church.id,
        "Energia elétrica",
        None,
        Some("#F59E0B"),
        &conn,
    )?;

    create_entry(
        LedgerSide::Revenue,
        EntryBuilder::new(1250.0, date!(2026 - 08 - 02), PaymentMethod::Pix)
            .description(Some("Dízimos do primeiro culto".to_owned()))
            .category_id(Some(tithes.id)),
        &context,
        &conn,
    )?;
    create_entry(
        LedgerSide::Revenue,
        EntryBuilder::new(430.5, date!(2026 - 08 - 02), PaymentMethod::Cash)
            .description(Some("Ofertas".to_owned()))
            .category_id(Some(offerings.id)),
        &context,
        &conn,
    )?;
    create_entry(
        LedgerSide::Expense,
        EntryBuilder::new(312.75, date!(2026 - 08 - 10), PaymentMethod::Transfer)
            .description(Some("Conta de luz".to_owned()))
            .category_id(Some(utilities.id)),
        &context,
        &conn,
    )?;

    println!("Making an initial reserve fund deposit...");

    deposit(&context, 200.0, None, date!(2026 - 08 - 15), &conn)?;

    println!("Success! Sign in with test@test.com / test");

    Ok(())
}
