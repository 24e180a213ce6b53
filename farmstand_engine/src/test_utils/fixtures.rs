use crate::{
    db_types::{NewProduct, NewUser, Paise, Product, Role, User},
    traits::{InventoryManagement, UserManagement},
    SqliteDatabase,
};

pub async fn seed_user(db: &SqliteDatabase, name: &str, role: Role) -> User {
    let email = format!("{}@farmstand.test", name.to_lowercase().replace(' ', "."));
    let user = NewUser::new(name, email.as_str(), role, "Nashik").with_phone("+91 98000 00000");
    db.insert_user(user).await.expect("Error seeding user")
}

pub async fn seed_product(db: &SqliteDatabase, owner: &User, name: &str, price_rupees: i64, stock: i64) -> Product {
    let product = NewProduct::new(owner.id, name, Paise::from_rupees(price_rupees), stock).with_unit("kg");
    db.insert_product(product).await.expect("Error seeding product")
}
