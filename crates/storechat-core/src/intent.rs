//! Intent labels the backend attaches to replies, and the follow-up actions
//! a client can offer for each.

use serde::{Deserialize, Serialize};

/// A follow-up action offered for an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentAction {
    pub label: &'static str,
    pub action: &'static str,
}

const fn action(label: &'static str, action: &'static str) -> IntentAction {
    IntentAction { label, action }
}

/// Known intent classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    FindProductToHook,
    CreateDiscountAskMore,
    FindBestSellingProducts,
    GeneralInquiry,
}

impl IntentKind {
    pub const ALL: [IntentKind; 4] = [
        IntentKind::FindProductToHook,
        IntentKind::CreateDiscountAskMore,
        IntentKind::FindBestSellingProducts,
        IntentKind::GeneralInquiry,
    ];

    /// Map a backend label to a known kind; unknown labels are general inquiries
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "find_product_to_hook" => Self::FindProductToHook,
            "create_discount_ask_more" => Self::CreateDiscountAskMore,
            "find_best_selling_products" => Self::FindBestSellingProducts,
            _ => Self::GeneralInquiry,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindProductToHook => "find_product_to_hook",
            Self::CreateDiscountAskMore => "create_discount_ask_more",
            Self::FindBestSellingProducts => "find_best_selling_products",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::FindProductToHook => "Product Search",
            Self::CreateDiscountAskMore => "Discount Creation",
            Self::FindBestSellingProducts => "Product Analytics",
            Self::GeneralInquiry => "General Help",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FindProductToHook => "Find products to create compelling hooks",
            Self::CreateDiscountAskMore => "Create and manage discount campaigns",
            Self::FindBestSellingProducts => "Analyze product performance and trends",
            Self::GeneralInquiry => "Get help with your store and business",
        }
    }

    pub fn actions(&self) -> &'static [IntentAction] {
        const PRODUCT_SEARCH: [IntentAction; 3] = [
            action("Search Products", "search"),
            action("View Categories", "categories"),
            action("Filter by Price", "price_filter"),
        ];
        const DISCOUNTS: [IntentAction; 3] = [
            action("Create Discount", "create"),
            action("View Existing", "view"),
            action("Analytics", "analytics"),
        ];
        const ANALYTICS: [IntentAction; 3] = [
            action("View Reports", "reports"),
            action("Export Data", "export"),
            action("Set Alerts", "alerts"),
        ];
        const GENERAL: [IntentAction; 3] = [
            action("View Documentation", "docs"),
            action("Contact Support", "support"),
            action("FAQ", "faq"),
        ];

        match self {
            Self::FindProductToHook => &PRODUCT_SEARCH,
            Self::CreateDiscountAskMore => &DISCOUNTS,
            Self::FindBestSellingProducts => &ANALYTICS,
            Self::GeneralInquiry => &GENERAL,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-readable form of a raw label: `find_best_selling_products` becomes
/// `Find Best Selling Products`
pub fn display_label(label: &str) -> String {
    label
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
