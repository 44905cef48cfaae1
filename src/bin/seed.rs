use rust_decimal::Decimal;
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    services::auth_service::{DEFAULT_COUNTRY, hash_password},
};
use uuid::Uuid;

struct SeedProduct {
    nom: &'static str,
    description: &'static str,
    prix: Decimal,
    prix_promo: Option<Decimal>,
    categorie: &'static str,
    sous_categorie: &'static str,
    tailles: &'static [&'static str],
    couleurs: &'static [&'static str],
    stock: i32,
    marque: &'static str,
    en_vedette: bool,
    note: f64,
    nombre_avis: i32,
}

// Prices in cents.
fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(
        &pool,
        ("Admin", "Super"),
        "admin@vetements.com",
        "admin123",
        "admin",
        "21612345678",
    )
    .await?;
    let client_id = ensure_user(
        &pool,
        ("Client", "Test"),
        "client@test.com",
        "client123",
        "client",
        "21698765432",
    )
    .await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Client ID: {client_id}");
    println!("Admin: admin@vetements.com / admin123");
    println!("Client: client@test.com / client123");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    (nom, prenom): (&str, &str),
    email: &str,
    password: &str,
    role: &str,
    telephone: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, nom, prenom, email, password_hash, telephone, pays, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (email) DO UPDATE
            SET role = EXCLUDED.role, password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(nom)
    .bind(prenom)
    .bind(email)
    .bind(password_hash)
    .bind(telephone)
    .bind(DEFAULT_COUNTRY)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Products already present ({existing}), skipping catalog seed");
        return Ok(());
    }

    for product in catalog() {
        let tailles: Vec<String> = product.tailles.iter().map(|s| s.to_string()).collect();
        let couleurs: Vec<String> = product.couleurs.iter().map(|s| s.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO products
                (id, nom, description, prix, prix_promo, categorie, sous_categorie,
                 tailles, couleurs, stock, images, marque, en_vedette, note, nombre_avis)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, '{}', $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.nom)
        .bind(product.description)
        .bind(product.prix)
        .bind(product.prix_promo)
        .bind(product.categorie)
        .bind(product.sous_categorie)
        .bind(tailles)
        .bind(couleurs)
        .bind(product.stock)
        .bind(product.marque)
        .bind(product.en_vedette)
        .bind(product.note)
        .bind(product.nombre_avis)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

fn catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            nom: "T-shirt Homme Blanc",
            description: "T-shirt 100% coton, confortable et respirant. Parfait pour un style décontracté.",
            prix: cents(2999),
            prix_promo: None,
            categorie: "homme",
            sous_categorie: "t-shirt",
            tailles: &["S", "M", "L", "XL"],
            couleurs: &["Blanc", "Noir", "Gris"],
            stock: 50,
            marque: "BasicWear",
            en_vedette: true,
            note: 4.5,
            nombre_avis: 23,
        },
        SeedProduct {
            nom: "Jean Slim Homme",
            description: "Jean slim stretch, coupe moderne et confortable.",
            prix: cents(7999),
            prix_promo: Some(cents(5999)),
            categorie: "homme",
            sous_categorie: "pantalon",
            tailles: &["30", "32", "34", "36", "38"],
            couleurs: &["Bleu", "Noir"],
            stock: 30,
            marque: "DenimCo",
            en_vedette: true,
            note: 4.8,
            nombre_avis: 45,
        },
        SeedProduct {
            nom: "Robe Été Femme",
            description: "Robe légère et élégante, idéale pour les journées ensoleillées.",
            prix: cents(8999),
            prix_promo: None,
            categorie: "femme",
            sous_categorie: "robe",
            tailles: &["XS", "S", "M", "L"],
            couleurs: &["Rouge", "Bleu", "Jaune"],
            stock: 25,
            marque: "SummerStyle",
            en_vedette: true,
            note: 4.7,
            nombre_avis: 38,
        },
        SeedProduct {
            nom: "Veste Jean Femme",
            description: "Veste en jean classique, intemporelle et polyvalente.",
            prix: cents(9999),
            prix_promo: Some(cents(7999)),
            categorie: "femme",
            sous_categorie: "veste",
            tailles: &["S", "M", "L", "XL"],
            couleurs: &["Bleu clair", "Noir"],
            stock: 20,
            marque: "DenimCo",
            en_vedette: true,
            note: 4.6,
            nombre_avis: 31,
        },
        SeedProduct {
            nom: "Pantalon Enfant",
            description: "Pantalon confortable pour enfants, résistant et facile d'entretien.",
            prix: cents(3999),
            prix_promo: None,
            categorie: "enfant",
            sous_categorie: "pantalon",
            tailles: &["4ans", "6ans", "8ans", "10ans", "12ans"],
            couleurs: &["Bleu", "Noir", "Beige"],
            stock: 40,
            marque: "KidsWear",
            en_vedette: false,
            note: 4.4,
            nombre_avis: 19,
        },
        SeedProduct {
            nom: "Chemise Homme Blanche",
            description: "Chemise élégante pour occasions formelles.",
            prix: cents(4999),
            prix_promo: None,
            categorie: "homme",
            sous_categorie: "t-shirt",
            tailles: &["S", "M", "L", "XL", "XXL"],
            couleurs: &["Blanc", "Bleu clair"],
            stock: 35,
            marque: "FormalWear",
            en_vedette: false,
            note: 4.3,
            nombre_avis: 27,
        },
        SeedProduct {
            nom: "Jupe Plissée Femme",
            description: "Jupe plissée élégante, parfaite pour le bureau ou les sorties.",
            prix: cents(5999),
            prix_promo: None,
            categorie: "femme",
            sous_categorie: "jupe",
            tailles: &["XS", "S", "M", "L"],
            couleurs: &["Noir", "Bordeaux", "Marine"],
            stock: 28,
            marque: "ChicStyle",
            en_vedette: true,
            note: 4.5,
            nombre_avis: 22,
        },
        SeedProduct {
            nom: "Baskets Sport Homme",
            description: "Baskets confortables pour le sport et le quotidien.",
            prix: cents(8999),
            prix_promo: Some(cents(6999)),
            categorie: "homme",
            sous_categorie: "chaussures",
            tailles: &["40", "41", "42", "43", "44"],
            couleurs: &["Blanc", "Noir", "Gris"],
            stock: 45,
            marque: "SportPro",
            en_vedette: true,
            note: 4.9,
            nombre_avis: 67,
        },
        SeedProduct {
            nom: "Sac à Main Femme",
            description: "Sac élégant en cuir synthétique, spacieux et pratique.",
            prix: cents(6999),
            prix_promo: None,
            categorie: "accessoires",
            sous_categorie: "sac",
            tailles: &["Unique"],
            couleurs: &["Noir", "Marron", "Beige"],
            stock: 22,
            marque: "LuxeBags",
            en_vedette: false,
            note: 4.6,
            nombre_avis: 34,
        },
        SeedProduct {
            nom: "Sweat à Capuche Unisexe",
            description: "Sweat confortable avec capuche, idéal pour les journées fraîches.",
            prix: cents(4999),
            prix_promo: None,
            categorie: "homme",
            sous_categorie: "t-shirt",
            tailles: &["S", "M", "L", "XL", "XXL"],
            couleurs: &["Noir", "Gris", "Marine", "Bordeaux"],
            stock: 60,
            marque: "ComfortWear",
            en_vedette: true,
            note: 4.7,
            nombre_avis: 52,
        },
    ]
}
