use crate::{
    db_types::{NewUser, User, UserId},
    traits::MarketplaceError,
};

/// Profile storage for users issued by the authentication service.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketplaceError>;

    async fn fetch_user(&self, id: UserId) -> Result<Option<User>, MarketplaceError>;
}
