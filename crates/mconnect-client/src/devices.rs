//! Device management calls and last-seen handling.
//!
//! Devices belong to exactly one community; none of these calls fan out.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use mconnect_shared::constants::POSITION_PAGE_SIZE;
use mconnect_shared::wire::{lenient_string_map, opt_code};
use mconnect_shared::{
    DeviceDraft, DeviceId, DeviceQuery, DeviceRecord, DeviceScope, LastSeenMap, Page, Position,
    SerialAvailability,
};

use crate::envelope::ApiEnvelope;
use crate::error::{ClientError, Result};
use crate::http::CloudClient;
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct SerialStatus {
    #[serde(default, deserialize_with = "opt_code")]
    status: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LastSeenData {
    #[serde(default, deserialize_with = "lenient_string_map")]
    map: LastSeenMap,
}

#[derive(Debug, Deserialize)]
struct LastSeenSyncReply {
    #[serde(flatten)]
    envelope: ApiEnvelope<Value>,
    #[serde(default)]
    processed: Option<u64>,
}

fn scope_body(session: &Session, scope: &DeviceScope) -> serde_json::Map<String, Value> {
    let mut body = serde_json::Map::new();
    body.insert("accessToken".into(), session.access_token().into());
    body.insert("extCommunityId".into(), scope.community_id.as_str().into());
    if let Some(uuid) = scope.community_uuid.as_deref() {
        body.insert("extCommunityUuid".into(), uuid.into());
    }
    body
}

fn scope_params<'a>(session: &'a Session, scope: &'a DeviceScope) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("accessToken", session.access_token()),
        ("extCommunityId", scope.community_id.as_str()),
    ];
    if let Some(uuid) = scope.community_uuid.as_deref() {
        params.push(("extCommunityUuid", uuid));
    }
    params
}

impl CloudClient {
    async fn post_envelope<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Map<String, Value>,
    ) -> Result<ApiEnvelope<T>> {
        let resp = self.http().post(self.url(path)).json(body).send().await?;
        Self::decode(resp).await
    }

    pub async fn list_devices(
        &self,
        session: &Session,
        scope: &DeviceScope,
        query: &DeviceQuery,
    ) -> Result<Page<DeviceRecord>> {
        let mut params = scope_body(session, scope);
        params.insert("currPage".into(), query.page.max(1).into());
        params.insert("pageSize".into(), query.page_size.into());
        if let Some(name) = query.name.as_deref().filter(|s| !s.trim().is_empty()) {
            params.insert("name".into(), name.trim().into());
        }
        if let Some(sn) = query.dev_sn.as_deref().filter(|s| !s.trim().is_empty()) {
            params.insert("devSn".into(), sn.trim().into());
        }
        if let Some(status) = query.status {
            params.insert("status".into(), status.into());
        }

        // This endpoint wants its filters nested under `params`.
        let mut body = serde_json::Map::new();
        body.insert("params".into(), Value::Object(params));

        self.post_envelope("api/devices/list", &body)
            .await?
            .into_data_or_default()
    }

    pub async fn get_device(
        &self,
        session: &Session,
        scope: &DeviceScope,
        id: &DeviceId,
        dev_sn: &str,
    ) -> Result<DeviceRecord> {
        let mut body = scope_body(session, scope);
        body.insert("id".into(), id.as_str().into());
        body.insert("devSn".into(), dev_sn.into());

        self.post_envelope("api/devices/get", &body)
            .await?
            .into_data("device")
    }

    pub async fn add_device(
        &self,
        session: &Session,
        scope: &DeviceScope,
        draft: &DeviceDraft,
    ) -> Result<()> {
        draft.validate()?;

        let mut body = scope_body(session, scope);
        body.insert("devSn".into(), draft.dev_sn.trim().into());
        body.insert("name".into(), draft.name.trim().into());
        body.insert("positionId".into(), draft.position_id.as_str().into());

        self.post_envelope::<Value>("api/devices/add", &body)
            .await?
            .into_ack()?;
        info!(community = %scope.community_id, dev_sn = %draft.dev_sn, "Device added");
        Ok(())
    }

    /// Rename or move a device. The serial number is immutable.
    pub async fn update_device(
        &self,
        session: &Session,
        scope: &DeviceScope,
        id: &DeviceId,
        draft: &DeviceDraft,
    ) -> Result<()> {
        draft.validate()?;

        let mut body = scope_body(session, scope);
        body.insert("id".into(), id.as_str().into());
        body.insert("name".into(), draft.name.trim().into());
        body.insert("positionId".into(), draft.position_id.as_str().into());

        self.post_envelope::<Value>("api/devices/update", &body)
            .await?
            .into_ack()
    }

    pub async fn delete_devices(
        &self,
        session: &Session,
        scope: &DeviceScope,
        dev_sns: &[String],
    ) -> Result<()> {
        let mut body = scope_body(session, scope);
        body.insert("devSns".into(), dev_sns.join(",").into());

        self.post_envelope::<Value>("api/devices/delete", &body)
            .await?
            .into_ack()?;
        info!(community = %scope.community_id, count = dev_sns.len(), "Devices deleted");
        Ok(())
    }

    pub async fn check_serial(&self, session: &Session, dev_sn: &str) -> Result<SerialAvailability> {
        let body = json!({ "accessToken": session.access_token(), "devSn": dev_sn });
        let resp = self
            .http()
            .post(self.url("api/devices/check"))
            .json(&body)
            .send()
            .await?;

        let status: SerialStatus = Self::decode(resp).await?.into_data("device status")?;
        Ok(SerialAvailability::from_code(status.status.unwrap_or(-1)))
    }

    /// Swap a physical device for a new one, keeping its configuration.
    ///
    /// The new serial must be unbound. When the availability check itself
    /// fails for a non-session reason the replacement is still attempted and
    /// the backend decides.
    pub async fn replace_device(
        &self,
        session: &Session,
        scope: &DeviceScope,
        old_dev_sn: &str,
        new_dev_sn: &str,
    ) -> Result<()> {
        let new_sn = new_dev_sn.trim();
        if new_sn.is_empty() {
            return Err(mconnect_shared::ValidationError::DeviceSerialRequired.into());
        }

        match self.check_serial(session, new_sn).await {
            Ok(availability) if !availability.is_available() => {
                return Err(ClientError::SerialUnavailable(new_sn.to_string()));
            }
            Ok(_) => {}
            Err(e) if e.is_session_failure() => return Err(e),
            Err(e) => warn!(error = %e, dev_sn = %new_sn, "Serial check failed, trying replace anyway"),
        }

        let mut body = scope_body(session, scope);
        body.insert("oldDevSn".into(), old_dev_sn.into());
        body.insert("newDevSn".into(), new_sn.into());

        self.post_envelope::<Value>("api/devices/replace", &body)
            .await?
            .into_ack()?;
        info!(old = %old_dev_sn, new = %new_sn, "Device replaced");
        Ok(())
    }

    /// Building units offered in the device form.
    pub async fn building_units(&self, session: &Session, scope: &DeviceScope) -> Result<Vec<Position>> {
        let page_size = POSITION_PAGE_SIZE.to_string();
        let mut params = scope_params(session, scope);
        params.push(("currPage", "1"));
        params.push(("pageSize", &page_size));

        let resp = self
            .http()
            .get(self.url("api/devices/building-units"))
            .query(&params)
            .send()
            .await?;

        let page: Page<Position> = Self::decode(resp).await?.into_data_or_default()?;
        Ok(page.list)
    }

    pub async fn last_seen_map(&self, session: &Session, scope: &DeviceScope) -> Result<LastSeenMap> {
        let resp = self
            .http()
            .get(self.url("api/local/lastseen/map"))
            .query(&scope_params(session, scope))
            .send()
            .await?;

        let data: LastSeenData = Self::decode(resp).await?.into_data("last-seen map")?;
        Ok(data.map)
    }

    /// Ask the backend to refresh last-seen for the whole community. Returns
    /// the number of devices it processed.
    pub async fn sync_last_seen(&self, session: &Session, scope: &DeviceScope) -> Result<u64> {
        let resp = self
            .http()
            .get(self.url("api/local/lastseen/sync"))
            .query(&scope_params(session, scope))
            .send()
            .await?;

        let reply: LastSeenSyncReply = {
            let status = resp.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ClientError::InvalidToken);
            }
            let body = resp.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?
        };

        reply.envelope.into_ack()?;
        let processed = reply.processed.unwrap_or(0);
        info!(community = %scope.community_id, processed, "Last-seen sync done");
        Ok(processed)
    }
}

/// Fill `last_seen` and its relative text from the cached map. Online
/// devices show none.
pub fn merge_last_seen(devices: &mut [DeviceRecord], map: &LastSeenMap, now: DateTime<Utc>) {
    for device in devices {
        device.last_seen = if device.is_online() {
            None
        } else {
            map.get(&device.dev_sn)
                .filter(|ts| !ts.trim().is_empty())
                .cloned()
        };
        device.last_seen_text = device
            .last_seen
            .as_deref()
            .and_then(|ts| last_seen_text(ts, now));
    }
}

/// Human-readable age of a last-seen timestamp: RFC 3339, `%Y-%m-%d %H:%M:%S`
/// or epoch milliseconds.
///
/// `None` for blank or unparseable values.
pub fn last_seen_text(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let ts = timestamp.trim();
    if ts.is_empty() {
        return None;
    }

    let last = if ts.bytes().all(|b| b.is_ascii_digit()) {
        Utc.timestamp_millis_opt(ts.parse().ok()?).single()?
    } else {
        DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
            })
            .ok()?
    };

    let secs = (now - last).num_seconds();
    Some(match secs {
        s if s < 60 => "Just now".to_string(),
        s if s < 3600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} hr ago", s / 3600),
        _ => last.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}
