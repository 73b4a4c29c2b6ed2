//! Database seeder for Cashpoint development and testing.
//!
//! Seeds two points of attention, the working currencies, one operator
//! assigned to each point and an administrator, then prints a bearer token
//! for every actor.
//!
//! Usage: cargo run --bin seeder

use cashpoint_core::ledger::ReferenceType;
use cashpoint_db::repositories::{
    AssignmentRepository, CatalogRepository, CreateCurrencyInput, CreatePointInput,
    ReferenceRepository,
};
use cashpoint_shared::types::{ActorId, PointId, ReferenceId};
use cashpoint_shared::{JwtConfig, JwtService, Role};
use uuid::Uuid;

/// Operator of the main point (consistent for all seeds).
const MAIN_OPERATOR_ID: &str = "00000000-0000-0000-0000-000000000101";
/// Operator of the north point (consistent for all seeds).
const NORTH_OPERATOR_ID: &str = "00000000-0000-0000-0000-000000000102";
/// Administrator (consistent for all seeds).
const ADMIN_ID: &str = "00000000-0000-0000-0000-000000000201";
/// Exchange operation registered for manual testing of movements.
const DEMO_EXCHANGE_ID: &str = "00000000-0000-0000-0000-000000000301";

const POINTS: [(&str, &str); 2] = [("MATRIZ", "Matriz Centro"), ("NORTE", "Sucursal Norte")];

const CURRENCIES: [(&str, &str, i32); 3] = [
    ("USD", "US Dollar", 1),
    ("EUR", "Euro", 2),
    ("COP", "Peso Colombiano", 3),
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = cashpoint_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let catalog = CatalogRepository::new(db.clone());

    println!("Seeding points...");
    let mut point_ids = Vec::new();
    for (code, name) in POINTS {
        if let Some(point_id) = seed_point(&catalog, code, name).await {
            point_ids.push(point_id);
        }
    }

    println!("Seeding currencies...");
    for (code, name, display_order) in CURRENCIES {
        seed_currency(&catalog, code, name, display_order).await;
    }

    println!("Seeding assignments...");
    let assignments = AssignmentRepository::new(db.clone());
    let operators = [actor(MAIN_OPERATOR_ID), actor(NORTH_OPERATOR_ID)];
    for (actor_id, point_id) in operators.iter().zip(&point_ids) {
        match assignments.assign(*actor_id, *point_id).await {
            Ok(_) => println!("  Assigned {actor_id} to {point_id}"),
            Err(e) => eprintln!("Failed to assign {actor_id}: {e}"),
        }
    }

    println!("Seeding references...");
    let demo_exchange = ReferenceId::from_uuid(parse(DEMO_EXCHANGE_ID));
    if let Err(e) = ReferenceRepository::new(db.clone())
        .register(ReferenceType::Exchange, demo_exchange, point_ids.first().copied())
        .await
    {
        eprintln!("Failed to register demo exchange: {e}");
    } else {
        println!("  Registered EXCHANGE {demo_exchange}");
    }

    println!("Issuing tokens...");
    let secret = std::env::var("CASHPOINT__JWT__SECRET")
        .unwrap_or_else(|_| JwtConfig::default().secret);
    let jwt = JwtService::new(JwtConfig {
        secret,
        ..JwtConfig::default()
    });
    for (actor_id, point_id) in operators.iter().zip(&point_ids) {
        print_token(&jwt, "operator", *actor_id, Some(*point_id), Role::Operator);
    }
    print_token(&jwt, "admin", actor(ADMIN_ID), None, Role::Admin);

    println!("Seeding complete!");
}

fn parse(id: &str) -> Uuid {
    Uuid::parse_str(id).expect("seed IDs are valid UUIDs")
}

fn actor(id: &str) -> ActorId {
    ActorId::from_uuid(parse(id))
}

/// Returns the point with `code`, creating it if missing.
async fn seed_point(catalog: &CatalogRepository, code: &str, name: &str) -> Option<PointId> {
    match catalog.find_point_by_code(code).await {
        Ok(Some(point)) => {
            println!("  Point {code} already exists, skipping...");
            return Some(PointId::from_uuid(point.id));
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Failed to look up point {code}: {e}");
            return None;
        }
    }

    let input = CreatePointInput {
        code: code.to_string(),
        name: name.to_string(),
    };
    match catalog.create_point(input).await {
        Ok(point) => {
            println!("  Created point {code}: {name}");
            Some(PointId::from_uuid(point.id))
        }
        Err(e) => {
            eprintln!("Failed to insert point {code}: {e}");
            None
        }
    }
}

async fn seed_currency(catalog: &CatalogRepository, code: &str, name: &str, display_order: i32) {
    if let Ok(Some(_)) = catalog.find_currency_by_code(code).await {
        println!("  Currency {code} already exists, skipping...");
        return;
    }

    let input = CreateCurrencyInput {
        code: code.to_string(),
        name: name.to_string(),
        display_order,
    };
    if let Err(e) = catalog.create_currency(input).await {
        eprintln!("Failed to insert currency {code}: {e}");
    } else {
        println!("  Created currency {code}");
    }
}

fn print_token(jwt: &JwtService, label: &str, actor_id: ActorId, point_id: Option<PointId>, role: Role) {
    match jwt.issue(actor_id.into_inner(), point_id.map(PointId::into_inner), role) {
        Ok(token) => println!("  {label} {actor_id}: {token}"),
        Err(e) => eprintln!("Failed to issue token for {actor_id}: {e}"),
    }
}
