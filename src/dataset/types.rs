use serde::{Deserialize, Serialize};

/// Feature names sent to team endpoints, in payload order.
pub const FEATURE_NAMES: [&str; 10] = [
    "amount",
    "time_of_day",
    "merchant_category",
    "distance_from_home",
    "distance_from_last_transaction",
    "ratio_to_median_purchase",
    "repeat_retailer",
    "used_chip",
    "used_pin",
    "online_order",
];

/// One held-out transaction as it appears in the `inputs` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub transaction_id: String,
    pub amount: f64,
    pub time_of_day: f64,
    pub merchant_category: f64,
    pub distance_from_home: f64,
    pub distance_from_last_transaction: f64,
    pub ratio_to_median_purchase: f64,
    pub repeat_retailer: f64,
    pub used_chip: f64,
    pub used_pin: f64,
    pub online_order: f64,
}

impl FeatureRecord {
    pub fn from_features(index: usize, f: [f64; 10]) -> Self {
        Self {
            transaction_id: format!("TXN_{:04}", index),
            amount: f[0],
            time_of_day: f[1],
            merchant_category: f[2],
            distance_from_home: f[3],
            distance_from_last_transaction: f[4],
            ratio_to_median_purchase: f[5],
            repeat_retailer: f[6],
            used_chip: f[7],
            used_pin: f[8],
            online_order: f[9],
        }
    }
}

/// Request body sent to every team endpoint.
#[derive(Debug, Serialize)]
pub struct PredictionRequest<'a> {
    pub inputs: &'a [FeatureRecord],
}

/// On-disk layout of a held-out dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    pub records: Vec<FeatureRecord>,
    pub labels: Vec<i64>,
}
