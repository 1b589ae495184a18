pub mod cart_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
