use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart, cart::Status, cart_item, user};
use crate::service::orders::{OrderClient, OrderError, OrderLine, OrderRequest};

#[derive(Error, Debug)]
pub enum CartError {
    #[error("User not found")]
    UserNotFound,
    #[error("No active cart found")]
    NoActiveCart,
    #[error("User already has an active cart")]
    CartAlreadyExists,
    #[error("Cart has no items to check out")]
    EmptyCart,
    #[error("It was not possible to create an order from this cart: {0}")]
    OrderRejected(#[from] OrderError),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

//Item as it arrives on the wire. Carts are wholesale collections of these;
//items are never addressed individually.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    pub product_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0.0))]
    pub unit_price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: i32,
    pub status: Status,
    pub items: Vec<cart_item::Model>,
}

impl CartResponse {
    fn new(cart: cart::Model, items: Vec<cart_item::Model>) -> Self {
        Self {
            id: cart.id,
            user_id: cart.user_id,
            status: cart.status,
            items,
        }
    }
}

pub async fn get_user(
    conn: &impl ConnectionTrait,
    email: &str,
) -> Result<user::Model, CartError> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(conn)
        .await?
        .ok_or(CartError::UserNotFound)
}

//The partial unique index on (user_id, status = 'Active') guarantees at
//most one row comes back.
pub async fn active_cart(
    conn: &impl ConnectionTrait,
    user: &user::Model,
) -> Result<Option<(cart::Model, Vec<cart_item::Model>)>, CartError> {
    let mut carts = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user.id))
        .filter(cart::Column::Status.eq(Status::Active))
        .find_with_related(cart_item::Entity)
        .all(conn)
        .await?;

    Ok(carts.pop())
}

pub async fn get_cart(db: &DatabaseConnection, email: &str) -> Result<CartResponse, CartError> {
    let user = get_user(db, email).await?;
    let (cart, items) = active_cart(db, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;

    Ok(CartResponse::new(cart, items))
}

pub async fn create_cart(
    db: &DatabaseConnection,
    email: &str,
    items: &[ItemSpec],
) -> Result<CartResponse, CartError> {
    let txn = db.begin().await?;

    let user = get_user(&txn, email).await?;
    if active_cart(&txn, &user).await?.is_some() {
        return Err(CartError::CartAlreadyExists);
    }

    let cart_id = Uuid::new_v4();
    let new_cart = cart::ActiveModel {
        id: Set(cart_id),
        user_id: Set(user.id),
        status: Set(Status::Active),
    };
    if let Err(err) = cart::Entity::insert(new_cart).exec(&txn).await {
        //A concurrent create for the same user trips the unique index; that
        //is a conflict, not a fault.
        return Err(match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => CartError::CartAlreadyExists,
            _ => CartError::Db(err),
        });
    }

    insert_items(&txn, cart_id, items).await?;

    let (cart, items) = active_cart(&txn, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;
    txn.commit().await?;

    info!(cart_id = %cart.id, user_id = user.id, "Created cart");
    Ok(CartResponse::new(cart, items))
}

//Full replacement of the item list, never a merge.
pub async fn add_items(
    db: &DatabaseConnection,
    email: &str,
    items: &[ItemSpec],
) -> Result<CartResponse, CartError> {
    let txn = db.begin().await?;

    let user = get_user(&txn, email).await?;
    let (cart, _) = active_cart(&txn, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;

    cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    insert_items(&txn, cart.id, items).await?;

    let (cart, items) = active_cart(&txn, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;
    txn.commit().await?;

    Ok(CartResponse::new(cart, items))
}

pub async fn cancel_cart(db: &DatabaseConnection, email: &str) -> Result<CartResponse, CartError> {
    let txn = db.begin().await?;

    let user = get_user(&txn, email).await?;
    let (cart, items) = active_cart(&txn, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;

    let mut entry: cart::ActiveModel = cart.into();
    entry.status = Set(Status::Cancelled);
    let cancelled = entry.update(&txn).await?;
    txn.commit().await?;

    info!(cart_id = %cancelled.id, user_id = user.id, "Cancelled cart");
    Ok(CartResponse::new(cancelled, items))
}

pub async fn checkout_cart(
    db: &DatabaseConnection,
    orders: &OrderClient,
    email: &str,
) -> Result<CartResponse, CartError> {
    let user = get_user(db, email).await?;
    let (cart, items) = active_cart(db, &user)
        .await?
        .ok_or(CartError::NoActiveCart)?;
    if items.is_empty() {
        return Err(CartError::EmptyCart);
    }

    //The order must be accepted downstream before the cart is finished; a
    //rejected order leaves the cart Active so the user can retry.
    let order = OrderRequest {
        user_id: user.id,
        items: items
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    };
    orders.submit_order(&order).await?;

    let txn = db.begin().await?;
    let mut entry: cart::ActiveModel = cart.into();
    entry.status = Set(Status::Finished);
    let finished = entry.update(&txn).await?;
    txn.commit().await?;

    info!(cart_id = %finished.id, user_id = user.id, "Checked out cart");
    Ok(CartResponse::new(finished, items))
}

async fn insert_items(
    conn: &impl ConnectionTrait,
    cart_id: Uuid,
    items: &[ItemSpec],
) -> Result<(), CartError> {
    //insert_many rejects an empty row set; an empty cart is legal here.
    if items.is_empty() {
        return Ok(());
    }

    let rows = items.iter().map(|item| cart_item::ActiveModel {
        cart_id: Set(cart_id),
        product_id: Set(item.product_id),
        quantity: Set(item.quantity),
        unit_price: Set(item.unit_price),
        ..Default::default()
    });
    cart_item::Entity::insert_many(rows).exec(conn).await?;

    Ok(())
}
