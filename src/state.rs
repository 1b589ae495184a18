use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    sentiment::SentimentClassifier,
    types::pricing::ShippingPolicy,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub shipping: ShippingPolicy,
}
