//! JSON shapes of the AutoDL REST API.

use keeper_common::{InstanceListing, InstanceRecord, InstanceStatus};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://www.autodl.com";

pub const PATH_LOGIN_FAILED_COUNT: &str = "/api/v1/login_failed/count";
pub const PATH_LOGIN: &str = "/api/v1/new_login";
pub const PATH_PASSPORT: &str = "/api/v1/passport";
pub const PATH_INSTANCES: &str = "/api/v1/instance";
pub const PATH_POWER_ON: &str = "/api/v1/instance/power_on";
pub const PATH_POWER_OFF: &str = "/api/v1/instance/power_off";

/// Region prefix the login form always submits.
pub const PHONE_AREA: &str = "+86";

// --- Requests ---

#[derive(Debug, Serialize)]
pub struct LoginFailedCountRequest<'a> {
    pub phone: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub phone: &'a str,
    pub password: &'a str,
    pub v_code: &'a str,
    pub phone_area: &'a str,
    pub picture_id: Option<String>,
}

impl<'a> LoginRequest<'a> {
    pub fn new(phone: &'a str, password: &'a str) -> Self {
        Self {
            phone,
            password,
            v_code: "",
            phone_area: PHONE_AREA,
            picture_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PassportRequest<'a> {
    pub ticket: &'a str,
}

/// Query string of the listing call. The `status` and `charge_type`
/// filters are empty lists, which a form encoder drops, so they are omitted.
#[derive(Debug, Serialize)]
pub struct InstanceListQuery {
    pub date_from: &'static str,
    pub date_to: &'static str,
    pub page_index: u32,
    pub page_size: u32,
}

impl Default for InstanceListQuery {
    fn default() -> Self {
        Self {
            date_from: "",
            date_to: "",
            page_index: 1,
            page_size: 100,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PowerOnRequest<'a> {
    pub instance_uuid: &'a str,
    pub payload: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PowerOffRequest<'a> {
    pub instance_uuid: &'a str,
}

// --- Responses ---

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PassportData {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstancePage {
    #[serde(default)]
    pub result_total: Option<u64>,
    #[serde(default)]
    pub list: Option<Vec<InstanceEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceEntry {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<InstanceEntry> for InstanceRecord {
    fn from(entry: InstanceEntry) -> Self {
        InstanceRecord {
            uuid: entry.uuid.unwrap_or_default(),
            name: entry.name.unwrap_or_default(),
            status: InstanceStatus::parse(entry.status.as_deref().unwrap_or("")),
        }
    }
}

impl From<InstancePage> for InstanceListing {
    fn from(page: InstancePage) -> Self {
        InstanceListing {
            result_total: page.result_total.unwrap_or(0),
            list: page
                .list
                .unwrap_or_default()
                .into_iter()
                .map(InstanceRecord::from)
                .collect(),
        }
    }
}

/// Drop empty strings so a `""` ticket or token counts as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
