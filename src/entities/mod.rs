pub mod cart;
pub mod cart_item;
pub mod user;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Schema, Set,
    Statement,
};

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    for mut table in [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(cart::Entity),
        schema.create_table_from_entity(cart_item::Entity),
    ] {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    //At most one Active cart per user, enforced by the database itself so
    //two concurrent creates cannot both slip past the existence check.
    db.execute(Statement::from_string(
        backend,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_cart_user_active \
         ON cart (user_id) WHERE status = 'Active'",
    ))
    .await?;

    Ok(())
}

//Users are owned by an external identity system; for local runs the mirror
//table is filled with a couple of demo accounts.
pub async fn seed_demo_users(db: &DatabaseConnection) -> Result<(), DbErr> {
    if user::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let users = ["alice@example.com", "bob@example.com"].map(|email| user::ActiveModel {
        email: Set(email.to_owned()),
        ..Default::default()
    });
    user::Entity::insert_many(users).exec(db).await?;

    Ok(())
}
