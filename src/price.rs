use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::str::FromStr;

/// Parses listing price texts like `"$6,554.05"` or `"US$19.99"` into an amount and currency.
///
/// The whole text must be a price: an optional currency symbol or ISO code,
/// one amount, and an optional trailing symbol or code. Anything else is rejected.
pub struct PriceParser {
    price_regex: Regex,
    currency_symbols: Vec<(String, String)>,
    default_currency: String,
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceParser {
    pub fn new() -> Self {
        Self::with_default_currency("AUD")
    }

    pub fn with_default_currency(default_currency: &str) -> Self {
        let mut symbols: HashMap<&str, &str> = HashMap::new();
        symbols.insert("$", default_currency);
        symbols.insert("US$", "USD");
        symbols.insert("USD$", "USD");
        symbols.insert("A$", "AUD");
        symbols.insert("AU$", "AUD");
        symbols.insert("NZ$", "NZD");
        symbols.insert("C$", "CAD");
        symbols.insert("£", "GBP");
        symbols.insert("€", "EUR");
        symbols.insert("¥", "JPY");
        symbols.insert("₹", "INR");

        // Longer symbols first so "US$" wins over "$"
        let mut currency_symbols: Vec<(String, String)> = symbols
            .into_iter()
            .map(|(symbol, code)| (symbol.to_string(), code.to_string()))
            .collect();
        currency_symbols.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let marker = currency_symbols
            .iter()
            .map(|(symbol, _)| regex::escape(symbol))
            .chain(std::iter::once("[A-Z]{3}".to_string()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r"^(?:(?P<pre>{marker})\s*)?(?P<amount>\d{{1,3}}(?:,\d{{3}})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:\s*(?P<post>{marker}))?$"
        );

        PriceParser {
            price_regex: Regex::new(&pattern).expect("price pattern is valid"),
            currency_symbols,
            default_currency: default_currency.to_string(),
        }
    }

    /// Amount and currency of a price-only `text`, `None` when the text holds anything else.
    pub fn parse(&self, text: &str) -> Option<(Decimal, String)> {
        let captures = self.price_regex.captures(text.trim())?;
        let price = Decimal::from_str(&captures.name("amount")?.as_str().replace(',', "")).ok()?;

        let markers = [captures.name("pre"), captures.name("post")];
        let mut codes = Vec::new();
        let mut symbol_currency = None;
        for marker in markers.iter().flatten().map(|m| m.as_str()) {
            if is_known_code(marker) {
                codes.push(marker);
            } else if let Some(code) = self.symbol_currency(marker) {
                symbol_currency.get_or_insert(code);
            } else {
                return None;
            }
        }

        // An ISO code is more specific than a symbol such as "$"
        let currency = match codes.as_slice() {
            [] => symbol_currency.unwrap_or(&self.default_currency).to_string(),
            [code] => code.to_string(),
            [first, second] if first == second => first.to_string(),
            _ => return None,
        };
        Some((price, currency))
    }

    fn symbol_currency(&self, marker: &str) -> Option<&str> {
        self.currency_symbols
            .iter()
            .find(|(symbol, _)| symbol == marker)
            .map(|(_, code)| code.as_str())
    }
}

fn is_known_code(code: &str) -> bool {
    matches!(
        code,
        "AUD" | "USD" | "NZD" | "CAD" | "GBP" | "EUR" | "JPY" | "INR" | "CNY" | "KRW" | "SGD" | "HKD" | "CHF"
    )
}

/// Symbol shown in front of an amount for a currency code.
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency {
        "AUD" | "USD" | "NZD" | "CAD" | "SGD" | "HKD" => "$",
        "GBP" => "£",
        "EUR" => "€",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        _ => "",
    }
}

/// Renders `amount` as e.g. `$6,554.05 AUD`.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = amount.abs().round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded);
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{}{}.{} {}", sign, currency_symbol(currency), grouped, fraction, currency)
}
