//! Nutrition label helpers
//!
//! Turns a [`ProductDetail`] into the values the detail page charts: the
//! calorie headline, per-nutrient gram amounts and grouped nutrient lists.

use crate::product::ProductDetail;
use serde::Serialize;

/// Milligrams per gram
pub const MG_TO_G: f64 = 1000.0;

/// Unit a nutrient is reported in by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientUnit {
    G,
    Mg,
}

/// Nutrients charted on the detail page, with the unit the API reports them in
pub const NUTRITION_MAPPING: [(&str, NutrientUnit); 8] = [
    ("carbohydrate", NutrientUnit::G),
    ("sugar", NutrientUnit::G),
    ("protein", NutrientUnit::G),
    ("fat", NutrientUnit::G),
    ("saturatedFat", NutrientUnit::G),
    ("transFat", NutrientUnit::G),
    ("sodium", NutrientUnit::Mg),
    ("cholesterol", NutrientUnit::Mg),
];

/// Calorie headline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieInfo {
    pub name: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

/// One charted nutrient, normalised to grams
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionValue {
    pub key: &'static str,
    /// Amount in grams
    pub value: f64,
    pub original_unit: NutrientUnit,
    /// Amount as reported, set only for nutrients converted from mg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_value: Option<f64>,
}

/// Named group of detailed nutrients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NutrientCategory {
    pub key: &'static str,
    pub title: &'static str,
    pub items: Vec<String>,
}

const NUTRIENT_CATEGORIES: [(&str, &str); 3] = [
    ("vitamins", "비타민"),
    ("minerals", "무기질"),
    ("allergens", "알레르기 유발 성분"),
];

impl ProductDetail {
    fn nutrient_amount(&self, key: &str) -> Option<f64> {
        match key {
            "carbohydrate" => self.carbohydrate,
            "sugar" => self.sugar,
            "protein" => self.protein,
            "fat" => self.fat,
            "saturatedFat" => self.saturated_fat,
            "transFat" => self.trans_fat,
            "sodium" => self.sodium,
            "cholesterol" => self.cholesterol,
            _ => None,
        }
    }

    fn nutrient_list(&self, key: &str) -> Option<&[String]> {
        match key {
            "vitamins" => self.vitamins.as_deref(),
            "minerals" => self.minerals.as_deref(),
            "allergens" => self.allergens.as_deref(),
            _ => None,
        }
    }

    /// Calorie headline, `None` when the product has no energy value
    pub fn calorie_info(&self) -> Option<CalorieInfo> {
        let value = self.energy.filter(|kcal| *kcal != 0.0)?;
        Some(CalorieInfo {
            name: "칼로리",
            value,
            unit: "kcal",
        })
    }

    /// Charted nutrients in gram units; mg nutrients keep their raw amount as display value
    pub fn nutrition_values(&self) -> Vec<NutritionValue> {
        NUTRITION_MAPPING
            .iter()
            .map(|&(key, unit)| {
                let amount = self.nutrient_amount(key);
                match unit {
                    NutrientUnit::Mg => NutritionValue {
                        key,
                        value: amount.unwrap_or(0.0) / MG_TO_G,
                        original_unit: unit,
                        display_value: amount,
                    },
                    NutrientUnit::G => NutritionValue {
                        key,
                        value: amount.unwrap_or(0.0),
                        original_unit: unit,
                        display_value: None,
                    },
                }
            })
            .collect()
    }

    /// Detailed nutrients grouped by category, skipping empty groups
    pub fn nutrient_categories(&self) -> Vec<NutrientCategory> {
        NUTRIENT_CATEGORIES
            .iter()
            .map(|&(key, title)| NutrientCategory {
                key,
                title,
                items: self.nutrient_list(key).map(<[String]>::to_vec).unwrap_or_default(),
            })
            .filter(|category| !category.items.is_empty())
            .collect()
    }
}
