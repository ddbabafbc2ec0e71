//! Equipment vocabulary shared across the engine
use serde::{Deserialize, Serialize};

use crate::quality::QualityTier;

/// Broad equipment categories with distinct wear profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    #[default]
    Weapon,
    Armor,
    Shield,
    Accessory,
}

impl EquipmentKind {
    pub const ALL: [Self; 4] = [Self::Weapon, Self::Armor, Self::Shield, Self::Accessory];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Shield => "shield",
            Self::Accessory => "accessory",
        }
    }

    /// Base durability loss per combat event.
    #[must_use]
    pub const fn combat_wear_base(self) -> f64 {
        match self {
            Self::Weapon => 0.5,
            Self::Armor => 0.2,
            Self::Shield => 0.3,
            Self::Accessory => 0.1,
        }
    }

    /// Base durability loss per hour of environmental exposure.
    #[must_use]
    pub const fn exposure_wear_base(self) -> f64 {
        match self {
            Self::Weapon => 0.02,
            Self::Armor => 0.015,
            Self::Shield => 0.01,
            Self::Accessory => 0.005,
        }
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Material composition; governs resistance to environmental wear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    #[default]
    Metal,
    Leather,
    Cloth,
    Wood,
    Magical,
    Adamantine,
    Mithril,
}

impl MaterialKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::Leather => "leather",
            Self::Cloth => "cloth",
            Self::Wood => "wood",
            Self::Magical => "magical",
            Self::Adamantine => "adamantine",
            Self::Mithril => "mithril",
        }
    }

    /// Higher means the material wears faster under exposure.
    #[must_use]
    pub const fn exposure_resistance(self) -> f64 {
        match self {
            Self::Metal => 1.0,
            Self::Leather => 1.3,
            Self::Cloth => 1.5,
            Self::Wood => 1.2,
            Self::Magical => 0.7,
            Self::Adamantine => 0.3,
            Self::Mithril => 0.4,
        }
    }
}

/// Ambient conditions the equipment is carried through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Normal,
    Humid,
    Dry,
    ExtremeCold,
    ExtremeHeat,
}

impl Environment {
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::Humid,
        Self::Dry,
        Self::ExtremeCold,
        Self::ExtremeHeat,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Humid => "humid",
            Self::Dry => "dry",
            Self::ExtremeCold => "extreme_cold",
            Self::ExtremeHeat => "extreme_heat",
        }
    }
}

/// Engine-side read model of a stored equipment entity.
///
/// The persistence collaborator owns the entity; the engine only reads a
/// snapshot and proposes new durability values back through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub id: String,
    pub kind: EquipmentKind,
    pub tier: QualityTier,
    /// Current condition, 0 (broken) to 100 (perfect)
    pub durability: f64,
    /// Base gold value; 0.0 means unknown and falls back to a flat repair base
    pub base_value: f64,
    pub material: MaterialKind,
}

impl EquipmentSnapshot {
    /// Damage severity in [0, 1]: how far from perfect the item is.
    #[must_use]
    pub fn damage_severity(&self) -> f64 {
        ((100.0 - self.durability) / 100.0).clamp(0.0, 1.0)
    }
}

/// Clamp a durability value into the valid 0-100 range.
#[must_use]
pub fn clamp_durability(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) }
}
