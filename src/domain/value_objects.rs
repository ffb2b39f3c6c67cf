use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 已创建，尚未发起STK推送
    Pending,
    /// 服务商已受理推送，等待回调
    Processing,
    /// 支付成功
    Confirmed,
    /// 支付失败
    Failed,
}

impl OrderStatus {
    /// 终态不可再变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DomainError::InternalError(format!(
                "Unknown order status: {}",
                other
            ))),
        }
    }
}

/// 客户端提交的金额，可以是数字或带货币前缀的字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

/// 货币金额（分为单位，避免浮点数精度问题）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// 金额（分）
    pub amount_cents: i64,
}

impl Money {
    /// 创建新的金额对象（单位：分）
    pub fn from_cents(cents: i64) -> Self {
        Self { amount_cents: cents }
    }

    /// 从客户端输入解析金额，必须为正数
    pub fn parse(input: &AmountInput) -> DomainResult<Self> {
        let money = match input {
            AmountInput::Number(value) => Self::from_major(*value)?,
            AmountInput::Text(text) => Self::from_decorated(text)?,
        };

        if money.amount_cents <= 0 {
            return Err(DomainError::InvalidAmount(
                "Amount must be greater than 0".to_string(),
            ));
        }

        Ok(money)
    }

    /// 从主单位浮点数创建，小数位规则与字符串输入一致
    pub fn from_major(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::InvalidAmount(format!(
                "Amount is not a finite number: {}",
                value
            )));
        }

        // f64 的 Display 输出最短可往返的十进制形式，且不使用科学计数法
        Self::from_decorated(&value.to_string())
    }

    /// 解析形如 "KSH 1,200.50" 的字符串：去掉货币符号、千分位和空白
    pub fn from_decorated(text: &str) -> DomainResult<Self> {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        let invalid = || DomainError::InvalidAmount(format!("Unrecognised amount: {:?}", text));

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(DomainError::InvalidAmount(format!(
                "Amount has more than two decimal places: {:?}",
                text
            )));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self::from_cents(if negative { -cents } else { cents }))
    }

    /// 转换为主单位
    pub fn to_major(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }

    /// 转换为分
    pub fn to_cents(&self) -> i64 {
        self.amount_cents
    }

    /// 发送给服务商的金额：整数金额按整数发送
    pub fn to_provider_amount(&self) -> serde_json::Value {
        if self.amount_cents % 100 == 0 {
            serde_json::Value::from(self.amount_cents / 100)
        } else {
            serde_json::Value::from(self.to_major())
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_major())
    }
}

/// 客户端提交的手机号，可以是数字或字符串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhoneInput {
    Number(u64),
    Text(String),
}

impl PhoneInput {
    pub fn to_text(&self) -> String {
        match self {
            PhoneInput::Number(n) => n.to_string(),
            PhoneInput::Text(t) => t.clone(),
        }
    }
}

/// 付款手机号（规范化为 254XXXXXXXXX）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);

        let invalid = || {
            DomainError::ValidationError(format!(
                "mpesa_number: {:?} is not a valid Safaricom number",
                raw
            ))
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let normalized = match digits.len() {
            12 if digits.starts_with("254") => digits.to_string(),
            10 if digits.starts_with('0') => format!("254{}", &digits[1..]),
            9 => format!("254{}", digits),
            _ => return Err(invalid()),
        };

        match normalized.as_bytes()[3] {
            b'7' | b'1' => Ok(Self(normalized)),
            _ => Err(invalid()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 付款人邮箱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        let invalid =
            || DomainError::ValidationError(format!("email: {:?} is not a valid address", raw));

        let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || trimmed.chars().any(char::is_whitespace)
            || trimmed.len() > 120
        {
            return Err(invalid());
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ISO 4217 货币代码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::ValidationError(format!(
                "currency: {:?} is not an ISO 4217 code",
                raw
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
