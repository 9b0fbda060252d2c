//! World collectibles and the shop catalog.
//!
//! Items placed in the world are static data; picking one up goes through
//! [`crate::transactions::collect_item`], which is idempotent per id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Coin,
    Badge,
    Powerup,
    Treasure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// A pickup placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectibleItem {
    pub id: &'static str,
    pub category: ItemCategory,
    pub coin_value: u64,
    pub point_value: u64,
    pub rarity: Rarity,
}

/// Something the player can buy with coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u64,
}

const fn item(
    id: &'static str,
    category: ItemCategory,
    coin_value: u64,
    point_value: u64,
    rarity: Rarity,
) -> CollectibleItem {
    CollectibleItem {
        id,
        category,
        coin_value,
        point_value,
        rarity,
    }
}

/// World pickups.
pub static COLLECTIBLES: [CollectibleItem; 10] = [
    item("coin_plaza", ItemCategory::Coin, 5, 0, Rarity::Common),
    item("coin_riverbank", ItemCategory::Coin, 5, 0, Rarity::Common),
    item("coin_market", ItemCategory::Coin, 10, 0, Rarity::Uncommon),
    item("seedling_badge", ItemCategory::Badge, 0, 25, Rarity::Uncommon),
    item("recycler_badge", ItemCategory::Badge, 0, 40, Rarity::Rare),
    item("bamboo_boots", ItemCategory::Powerup, 0, 15, Rarity::Common),
    item("solar_charm", ItemCategory::Powerup, 0, 30, Rarity::Rare),
    item("pearl_of_manila_bay", ItemCategory::Treasure, 50, 100, Rarity::Rare),
    item("narra_seed_chest", ItemCategory::Treasure, 40, 80, Rarity::Uncommon),
    item("tamaraw_totem", ItemCategory::Treasure, 100, 250, Rarity::Legendary),
];

/// Shop inventory.
pub static SHOP: [ShopItem; 5] = [
    ShopItem {
        id: "bamboo_hat",
        name: "Bamboo Hat",
        price: 30,
    },
    ShopItem {
        id: "reusable_bottle",
        name: "Reusable Bottle",
        price: 45,
    },
    ShopItem {
        id: "bike_upgrade",
        name: "Bike Upgrade",
        price: 120,
    },
    ShopItem {
        id: "solar_lamp",
        name: "Solar Lamp",
        price: 200,
    },
    ShopItem {
        id: "tree_planting_kit",
        name: "Tree Planting Kit",
        price: 80,
    },
];

pub fn collectible(id: &str) -> Option<&'static CollectibleItem> {
    COLLECTIBLES.iter().find(|i| i.id == id)
}

pub fn shop_item(id: &str) -> Option<&'static ShopItem> {
    SHOP.iter().find(|i| i.id == id)
}
