//! # Locale & Messages
//!
//! Per-request language selection and rendering of user-facing messages.
//!
//! ```text
//! request ──► Locale::resolve(cookie, Accept-Language, default)
//!                 │
//!                 ▼
//!          Messages::new(locale)
//!            ├── core_error(&CoreError)   → "الكمية يجب أن تكون 1 على الأقل"
//!            └── money(Money, "USD")      → "USD 4,500.00"
//! ```
//!
//! The locale is a plain value handed to whoever renders; nothing here is
//! global or mutable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, PricingError, ValidationError};
use crate::money::Money;

// =============================================================================
// Locale
// =============================================================================

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    /// Text direction for the `dir` attribute.
    pub const fn direction(&self) -> &'static str {
        match self {
            Locale::En => "ltr",
            Locale::Ar => "rtl",
        }
    }

    /// Picks the best supported language from an `Accept-Language` header.
    ///
    /// Entries are ranked by their `q` weight (default 1.0); ties keep
    /// header order. Returns `None` when nothing supported is listed.
    ///
    /// ```rust
    /// use stitch_core::locale::Locale;
    ///
    /// assert_eq!(Locale::from_accept_language("fr-FR, ar-EG;q=0.8, en;q=0.5"), Some(Locale::Ar));
    /// assert_eq!(Locale::from_accept_language("de"), None);
    /// ```
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut ranked: Vec<(f32, Locale)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let locale = parts.next()?.trim().parse::<Locale>().ok()?;
                let weight = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (weight > 0.0).then_some((weight, locale))
            })
            .collect();

        // stable sort keeps header order among equal weights
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.first().map(|(_, locale)| *locale)
    }

    /// Resolves the request locale: cookie, then `Accept-Language`, then default.
    pub fn resolve(cookie: Option<&str>, accept_language: Option<&str>, default: Locale) -> Locale {
        cookie
            .and_then(|value| value.parse().ok())
            .or_else(|| accept_language.and_then(Locale::from_accept_language))
            .unwrap_or(default)
    }
}

impl FromStr for Locale {
    type Err = ValidationError;

    /// Accepts a bare language or a full tag (`ar-EG`, `en_US`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match primary.as_str() {
            "en" => Ok(Locale::En),
            "ar" => Ok(Locale::Ar),
            _ => Err(ValidationError::NotAllowed {
                field: "locale".to_string(),
                allowed: vec!["en".to_string(), "ar".to_string()],
            }),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Renders user-facing text in one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Messages { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Formats an amount with its currency code.
    ///
    /// ```rust
    /// use stitch_core::locale::{Locale, Messages};
    /// use stitch_core::Money;
    ///
    /// let amount = Money::from_cents(450_000);
    /// assert_eq!(Messages::new(Locale::En).money(amount, "USD"), "USD 4,500.00");
    /// assert_eq!(Messages::new(Locale::Ar).money(amount, "USD"), "4,500.00 USD");
    /// ```
    pub fn money(&self, amount: Money, currency: &str) -> String {
        match self.locale {
            Locale::En => format!("{} {}", currency, amount),
            Locale::Ar => format!("{} {}", amount, currency),
        }
    }

    /// Message for a business rule failure.
    pub fn core_error(&self, err: &CoreError) -> String {
        match (self.locale, err) {
            (_, CoreError::Pricing(inner)) => self.pricing_error(inner),
            (_, CoreError::Validation(inner)) => self.validation_error(inner),

            (Locale::Ar, CoreError::ProductNotFound(_)) => "المنتج غير موجود".to_string(),
            (Locale::Ar, CoreError::ProductUnavailable(_)) => {
                "هذا المنتج غير متاح للطلب حالياً".to_string()
            }
            (Locale::Ar, CoreError::BelowMinimumOrder { moq, .. }) => {
                format!("الحد الأدنى للطلب هو {} قطعة", moq)
            }
            (Locale::Ar, CoreError::QuantityTooLarge { max, .. }) => {
                format!("الكمية يجب ألا تتجاوز {}", max)
            }
            (Locale::Ar, CoreError::InvalidTransition { .. }) => {
                "لا يمكن تغيير الحالة بهذا الشكل".to_string()
            }
            (Locale::Ar, CoreError::NotPermitted { .. }) => {
                "ليس لديك صلاحية لتنفيذ هذا الإجراء".to_string()
            }
            (Locale::Ar, CoreError::OrderNotInvoiceable { .. }) => {
                "لا يمكن إصدار فاتورة قبل تأكيد الطلب".to_string()
            }
            (Locale::Ar, CoreError::InvoiceNotPayable { .. }) => {
                "هذه الفاتورة لا تقبل مدفوعات جديدة".to_string()
            }
            (Locale::Ar, CoreError::InvalidPaymentAmount { .. }) => {
                "مبلغ الدفع غير صالح".to_string()
            }
            (Locale::Ar, CoreError::AmountOutOfRange(_)) => "المبلغ خارج النطاق المسموح".to_string(),

            (Locale::En, CoreError::BelowMinimumOrder { moq, .. }) => {
                format!("Minimum order is {} pieces", moq)
            }
            (Locale::En, CoreError::NotPermitted { .. }) => {
                "You are not allowed to do that".to_string()
            }
            (Locale::En, other) => other.to_string(),
        }
    }

    /// Message for a pricing failure.
    pub fn pricing_error(&self, err: &PricingError) -> String {
        match (self.locale, err) {
            (Locale::En, PricingError::InvalidQuantity { .. }) => {
                "Quantity must be at least 1".to_string()
            }
            (Locale::En, other) => other.to_string(),

            (Locale::Ar, PricingError::InvalidQuantity { .. }) => {
                "الكمية يجب أن تكون 1 على الأقل".to_string()
            }
            (Locale::Ar, PricingError::InvalidTierData { min_quantity, .. }) => {
                format!("شريحة السعر التي تبدأ من {} غير صالحة", min_quantity)
            }
            (Locale::Ar, PricingError::OverlappingTiers { first_min, second_min }) => {
                format!(
                    "شريحتا السعر اللتان تبدآن من {} و {} متداخلتان",
                    first_min, second_min
                )
            }
            (Locale::Ar, PricingError::UnboundedTierNotLast { .. }) => {
                "الشريحة المفتوحة يجب أن تكون الأخيرة".to_string()
            }
            (Locale::Ar, PricingError::TotalOverflow { .. }) => {
                "الإجمالي خارج النطاق المسموح".to_string()
            }
        }
    }

    /// Message for a field validation failure.
    pub fn validation_error(&self, err: &ValidationError) -> String {
        match (self.locale, err) {
            (Locale::En, other) => other.to_string(),

            (Locale::Ar, ValidationError::Required { field }) => {
                format!("الحقل {} مطلوب", field)
            }
            (Locale::Ar, ValidationError::TooLong { field, max }) => {
                format!("الحقل {} يجب ألا يتجاوز {} حرفاً", field, max)
            }
            (Locale::Ar, ValidationError::OutOfRange { field, min, max }) => {
                format!("الحقل {} يجب أن يكون بين {} و {}", field, min, max)
            }
            (Locale::Ar, ValidationError::InvalidFormat { field, .. }) => {
                format!("صيغة الحقل {} غير صحيحة", field)
            }
            (Locale::Ar, ValidationError::NotAllowed { field, allowed }) => {
                format!("الحقل {} يجب أن يكون أحد: {}", field, allowed.join("، "))
            }
            (Locale::Ar, ValidationError::MalformedBody { .. }) => "بيانات الطلب غير صالحة".to_string(),
        }
    }

    /// Generic message for failures the user cannot fix.
    pub fn internal_error(&self) -> String {
        match self.locale {
            Locale::En => "Something went wrong. Please try again later.".to_string(),
            Locale::Ar => "حدث خطأ ما. يرجى المحاولة لاحقاً.".to_string(),
        }
    }

    /// Message for missing or bad credentials.
    pub fn unauthorized(&self) -> String {
        match self.locale {
            Locale::En => "Please sign in to continue".to_string(),
            Locale::Ar => "يرجى تسجيل الدخول للمتابعة".to_string(),
        }
    }

    /// Message for a record that does not exist (or is not visible to the caller).
    pub fn not_found(&self, what: &str) -> String {
        match self.locale {
            Locale::En => format!("{} not found", what),
            Locale::Ar => format!("{} غير موجود", what),
        }
    }

    /// Message for a write that lost a race with another user.
    pub fn conflict(&self) -> String {
        match self.locale {
            Locale::En => "This record was changed by someone else. Reload and try again.".to_string(),
            Locale::Ar => "تم تعديل هذا السجل من قبل مستخدم آخر. أعد التحميل وحاول مجدداً.".to_string(),
        }
    }

    /// Message for a signed-in user acting outside their role.
    pub fn forbidden(&self) -> String {
        match self.locale {
            Locale::En => "You are not allowed to do that".to_string(),
            Locale::Ar => "ليس لديك صلاحية لتنفيذ هذا الإجراء".to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
