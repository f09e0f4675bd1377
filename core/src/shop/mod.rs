//! Key shop: spend coins on redeemable premium keys.

mod keys;

use chrono::NaiveDateTime;
use rand::Rng;
use spdm_types::{ShopConfig, ShopItemConfig};
use tracing::info;

use crate::error::EconomyError;
use crate::session::Session;
use crate::store::BalanceStore;

pub use keys::{KeyPool, parse_keys};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub duration_label: String,
    pub duration_days: u32,
    pub price: u32,
    pub description: String,
}

impl From<&ShopItemConfig> for ShopItem {
    fn from(config: &ShopItemConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            duration_label: config.duration_label.clone(),
            duration_days: config.duration_days,
            price: config.price,
            description: config.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub item_id: String,
    pub item_name: String,
    pub price: u32,
    pub key: String,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct Shop {
    items: Vec<ShopItem>,
    keys: KeyPool,
}

impl Shop {
    pub fn new(config: &ShopConfig, keys: KeyPool) -> Self {
        Self {
            items: config.items.iter().map(ShopItem::from).collect(),
            keys,
        }
    }

    pub fn items(&self) -> &[ShopItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&ShopItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn keys_available(&self, item_id: &str) -> usize {
        self.keys.available(item_id)
    }

    /// Buy `item_id`. A key must be on hand before any coins are taken.
    pub async fn purchase<S: BalanceStore, R: Rng + ?Sized>(
        &self,
        session: &mut Session<S>,
        item_id: &str,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<Purchase, EconomyError> {
        let user_id = session.require_user("make purchases")?.id.clone();
        let item = self.item(item_id).ok_or_else(|| EconomyError::NotFound {
            what: "shop item",
            id: item_id.to_string(),
        })?;
        let key = self
            .keys
            .pick(item_id, rng)
            .ok_or_else(|| EconomyError::NoKeysAvailable(item.name.clone()))?
            .to_string();

        let event = session
            .spend_coins(i64::from(item.price), &item.name, now)
            .await?;
        info!(user = %user_id, item = %item.id, price = item.price, "key purchased");

        Ok(Purchase {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            price: item.price,
            key,
            balance: event.balance(),
        })
    }
}
