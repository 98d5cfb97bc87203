//! BLE radio adapter.
//!
//! Implements [`AdvertisingPort`], [`GattPort`] and [`LinkPort`] on top of
//! the Bluedroid stack.  Stack callbacks never touch the core: they
//! translate into [`Event`]s and push them onto the event queue.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GAP/GATTS via `esp_idf_svc::sys`.
//! - **all other targets**: an in-memory simulation with one peer slot.
//!
//! ## GATT Service Layout (primary service `0xFFE0`)
//!
//! | Characteristic | UUID     | Props        | Contents                     |
//! |----------------|----------|--------------|------------------------------|
//! | Data           | `0xFFE1` | Read+Notify  | every push                   |
//! | Command        | `0xFFE2` | Write        | single-byte peer commands    |
//! | Battery        | `0xFFE3` | Read         | latest mV, i16 LE            |
//! | Temperature    | `0xFFE4` | Read         | latest 0.01 °C, i16 LE       |

use log::{info, warn};

use crate::app::ports::{
    AdvKind, AdvertisingPort, CharacteristicId, ConnHandle, GattPort, LinkPort,
};
use crate::config::{AdvParams, SystemConfig};
use crate::error::{AdvError, BondError, LinkError, NotifyError, SetValueError};
use crate::events::{Event, WritePayload};

/// Event for a peer write.  A write longer than any characteristic
/// ([`CharacteristicId::MAX_LEN`]) is dropped here with a warning.
pub fn write_event(
    handle: ConnHandle,
    characteristic: CharacteristicId,
    data: &[u8],
) -> Option<Event> {
    let Ok(payload) = WritePayload::from_slice(data) else {
        warn!(
            "BLE: {}-byte write to {:?} from {} dropped",
            data.len(),
            characteristic,
            handle
        );
        return None;
    };
    Some(Event::CharacteristicWrite {
        handle,
        characteristic,
        data: payload,
    })
}

fn queue(event: Event) {
    if !crate::events::push_event(event) {
        warn!("BLE: event queue full, stack event dropped");
    }
}

// ── ESP-IDF Bluedroid bridge ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
mod stack {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use esp_idf_svc::sys::*;

    use super::{queue, write_event};
    use crate::app::ports::{CharacteristicId, ConnHandle};
    use crate::events::{Event, SecurityOutcome};

    pub const NO_CONN: u32 = u32::MAX;

    pub static GATTS_IF: AtomicU32 = AtomicU32::new(ESP_GATT_IF_NONE as u32);
    pub static SERVICE_UUID16: AtomicU32 = AtomicU32::new(0);
    pub static CONN_ID: AtomicU32 = AtomicU32::new(NO_CONN);
    pub static PEER_ADDR: Mutex<[u8; 6]> = Mutex::new([0; 6]);

    static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CHAR_STEP: AtomicU32 = AtomicU32::new(0);
    /// Attribute handles, indexed like `CharacteristicId::ALL`.
    pub static CHAR_HANDLES: [AtomicU32; 4] = [
        AtomicU32::new(0),
        AtomicU32::new(0),
        AtomicU32::new(0),
        AtomicU32::new(0),
    ];

    pub fn attr_handle(c: CharacteristicId) -> Option<u16> {
        let idx = CharacteristicId::ALL.iter().position(|x| *x == c)?;
        match CHAR_HANDLES[idx].load(Ordering::Relaxed) {
            0 => None,
            h => Some(h as u16),
        }
    }

    fn characteristic_at(handle: u16) -> Option<CharacteristicId> {
        CHAR_HANDLES
            .iter()
            .position(|h| h.load(Ordering::Relaxed) == u32::from(handle))
            .map(|i| CharacteristicId::ALL[i])
    }

    fn uuid16(uuid: u16) -> esp_bt_uuid_t {
        // SAFETY: all-zero is a valid esp_bt_uuid_t.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 2;
        t.uuid.uuid16 = uuid;
        t
    }

    unsafe fn add_char(svc_handle: u16, c: CharacteristicId) {
        let (perm, prop) = match c {
            CharacteristicId::Data => (
                ESP_GATT_PERM_READ,
                ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
            ),
            CharacteristicId::Command => (
                ESP_GATT_PERM_WRITE,
                ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
            ),
            CharacteristicId::Battery | CharacteristicId::Temperature => {
                (ESP_GATT_PERM_READ, ESP_GATT_CHAR_PROP_BIT_READ)
            }
        };
        let mut uuid = uuid16(c.uuid16());
        let mut initial = [0u8; CharacteristicId::MAX_LEN];
        let mut value = esp_attr_value_t {
            attr_max_len: CharacteristicId::MAX_LEN as u16,
            attr_len: 2,
            attr_value: initial.as_mut_ptr(),
        };
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_AUTO_RSP as u8,
        };
        // SAFETY: Bluedroid copies uuid and initial value before returning.
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                &mut value,
                &mut control,
            );
        }
    }

    pub unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        param: *mut esp_ble_gap_cb_param_t,
    ) {
        // SAFETY: Bluedroid passes a valid param for the duration of the call.
        let param = unsafe { &mut *param };
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                let status = unsafe { param.adv_start_cmpl.status };
                if status != esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                    log::error!("BLE GAP: advertising start failed (status={})", status);
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                log::debug!("BLE GAP: advertising stopped");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => unsafe {
                esp_ble_gap_security_rsp(param.ble_security.ble_req.bd_addr.as_mut_ptr(), true);
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
                let p = unsafe { &param.ble_security.auth_cmpl };
                let conn = CONN_ID.load(Ordering::Relaxed);
                if conn == NO_CONN {
                    return;
                }
                let outcome = if p.success {
                    SecurityOutcome::Success
                } else {
                    log::warn!("BLE GAP: authentication failed (reason={})", p.fail_reason);
                    SecurityOutcome::Failed
                };
                queue(Event::SecurityResult {
                    handle: ConnHandle(conn as u16),
                    outcome,
                });
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_REMOVE_BOND_DEV_COMPLETE_EVT => {
                if unsafe { esp_ble_get_bond_device_num() } == 0 {
                    queue(Event::BondsDeleted);
                }
            }
            _ => {}
        }
    }

    pub unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        // SAFETY: Bluedroid passes a valid param for the duration of the call.
        let param = unsafe { &mut *param };
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                let status = unsafe { param.reg.status };
                if status != esp_gatt_status_t_ESP_GATT_OK {
                    queue(Event::StackError(status as i32));
                    return;
                }
                GATTS_IF.store(u32::from(gatts_if), Ordering::Relaxed);
                let uuid = SERVICE_UUID16.load(Ordering::Relaxed) as u16;
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid16(uuid),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                // Service + 4 × (declaration, value).
                unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 9) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc_handle = unsafe { param.create.service_handle };
                SVC_HANDLE.store(u32::from(svc_handle), Ordering::Relaxed);
                CHAR_STEP.store(0, Ordering::Relaxed);
                unsafe {
                    esp_ble_gatts_start_service(svc_handle);
                    add_char(svc_handle, CharacteristicId::ALL[0]);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = unsafe { param.add_char.attr_handle };
                let step = CHAR_STEP.fetch_add(1, Ordering::Relaxed) as usize;
                let Some(slot) = CHAR_HANDLES.get(step) else {
                    return;
                };
                slot.store(u32::from(handle), Ordering::Relaxed);
                log::info!(
                    "BLE GATTS: {:?} registered (handle={})",
                    CharacteristicId::ALL[step],
                    handle
                );
                if let Some(next) = CharacteristicId::ALL.get(step + 1) {
                    let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                    unsafe { add_char(svc_handle, *next) };
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &param.connect };
                CONN_ID.store(u32::from(p.conn_id), Ordering::Relaxed);
                if let Ok(mut addr) = PEER_ADDR.lock() {
                    *addr = p.remote_bda;
                }
                queue(Event::Connected {
                    handle: ConnHandle(p.conn_id),
                });
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let p = unsafe { &param.disconnect };
                CONN_ID.store(NO_CONN, Ordering::Relaxed);
                queue(Event::Disconnected {
                    handle: ConnHandle(p.conn_id),
                    reason: p.reason as u8,
                });
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &param.write };
                if p.need_rsp {
                    unsafe {
                        esp_ble_gatts_send_response(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                }
                let Some(characteristic) = characteristic_at(p.handle) else {
                    return;
                };
                let data = if p.value.is_null() {
                    &[][..]
                } else {
                    // SAFETY: value/len describe the write buffer for this call.
                    unsafe { core::slice::from_raw_parts(p.value, usize::from(p.len)) }
                };
                if let Some(event) = write_event(ConnHandle(p.conn_id), characteristic, data) {
                    queue(event);
                }
            }
            _ => {}
        }
    }

    /// Expiry of a bounded advertising window.
    pub unsafe extern "C" fn adv_window_cb(_arg: *mut core::ffi::c_void) {
        unsafe { esp_ble_gap_stop_advertising() };
        queue(Event::AdvertisingIdle);
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    device_name: heapless::String<16>,
    params: Option<AdvParams>,
    advertising: bool,
    #[cfg(target_os = "espidf")]
    adv_window: esp_idf_svc::sys::esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    sim: SimStack,
}

/// Host-side stand-in for the stack's own state.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimStack {
    peer: Option<ConnHandle>,
    payload: heapless::Vec<u8, { crate::config::MAX_ADV_PAYLOAD }>,
    values: [WritePayload; 4],
    bonds: u8,
}

impl BleAdapter {
    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Bring up the controller and Bluedroid, register the GATT service
    /// and configure pairing.  Advertising stays off until the core
    /// starts it.
    #[cfg(target_os = "espidf")]
    pub fn new(config: &SystemConfig) -> crate::error::Result<Self> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        use crate::error::Error;

        stack::SERVICE_UUID16.store(u32::from(config.service_uuid16), Ordering::Relaxed);

        // SAFETY: one-time stack bring-up from the main task before the
        // event loop; callbacks are static functions.
        unsafe {
            // BLE-only: release classic BT memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK as i32 {
                return Err(Error::Init("bt controller init"));
            }
            if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK as i32 {
                return Err(Error::Init("bt controller enable"));
            }
            if esp_bluedroid_init() != ESP_OK as i32 || esp_bluedroid_enable() != ESP_OK as i32 {
                return Err(Error::Init("bluedroid"));
            }

            esp_ble_gap_register_callback(Some(stack::gap_event_handler));
            esp_ble_gatts_register_callback(Some(stack::gatts_event_handler));
            if esp_ble_gatts_app_register(0) != ESP_OK as i32 {
                return Err(Error::Init("gatts app register"));
            }

            // Just-works pairing with bonding; the core decides whether
            // to request it.
            let auth_req = if config.pairing_enabled {
                esp_ble_auth_req_t_ESP_LE_AUTH_REQ_SC_BOND
            } else {
                esp_ble_auth_req_t_ESP_LE_AUTH_NO_BOND
            };
            let iocap = esp_ble_io_cap_t_ESP_IO_CAP_NONE;
            let key_size: u8 = 16;
            let keys: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE,
                &auth_req as *const _ as *mut _,
                core::mem::size_of_val(&auth_req) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE,
                &iocap as *const _ as *mut _,
                core::mem::size_of_val(&iocap) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE,
                &key_size as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY,
                &keys as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY,
                &keys as *const _ as *mut _,
                1,
            );

            let mut name = [0u8; 17];
            name[..config.device_name.len()].copy_from_slice(config.device_name.as_bytes());
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            let args = esp_timer_create_args_t {
                callback: Some(stack::adv_window_cb),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"adv_window".as_ptr(),
                skip_unhandled_events: true,
            };
            let mut adv_window: esp_timer_handle_t = core::ptr::null_mut();
            if esp_timer_create(&args, &mut adv_window) != ESP_OK as i32 {
                return Err(Error::Init("advertising window timer"));
            }

            info!("BLE(espidf): Bluedroid up as '{}'", config.device_name);
            Ok(Self {
                device_name: config.device_name.clone(),
                params: None,
                advertising: false,
                adv_window,
            })
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &SystemConfig) -> crate::error::Result<Self> {
        info!(
            "BLE(sim): stack up as '{}' (service 0x{:04X})",
            config.device_name, config.service_uuid16
        );
        Ok(Self {
            device_name: config.device_name.clone(),
            params: None,
            advertising: false,
            sim: SimStack::default(),
        })
    }

    /// Simulate a central connecting.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connect(&mut self, handle: ConnHandle) {
        self.advertising = false;
        self.sim.peer = Some(handle);
        queue(Event::Connected { handle });
    }

    /// Simulate the link dropping.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_disconnect(&mut self, reason: u8) {
        if let Some(handle) = self.sim.peer.take() {
            queue(Event::Disconnected { handle, reason });
        }
    }

    /// Value a peer read of `c` would return.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_value(&self, c: CharacteristicId) -> &[u8] {
        let idx = CharacteristicId::ALL.iter().position(|x| *x == c).unwrap_or(0);
        &self.sim.values[idx]
    }

    /// Last configured advertising payload.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_payload(&self) -> &[u8] {
        &self.sim.payload
    }
}

#[cfg(target_os = "espidf")]
fn adv_err(rc: i32) -> AdvError {
    use esp_idf_svc::sys::{ESP_ERR_INVALID_STATE, ESP_ERR_NO_MEM};
    match rc {
        rc if rc == ESP_ERR_NO_MEM as i32 => AdvError::ResourceExhausted,
        rc if rc == ESP_ERR_INVALID_STATE as i32 => AdvError::InvalidState,
        other => AdvError::Stack(other),
    }
}

#[cfg(target_os = "espidf")]
fn current_peer() -> Option<(u8, u16)> {
    use core::sync::atomic::Ordering;
    let conn = stack::CONN_ID.load(Ordering::Relaxed);
    if conn == stack::NO_CONN {
        return None;
    }
    Some((stack::GATTS_IF.load(Ordering::Relaxed) as u8, conn as u16))
}

// ───────────────────────────────────────────────────────────────
// AdvertisingPort implementation
// ───────────────────────────────────────────────────────────────

impl AdvertisingPort for BleAdapter {
    fn configure(&mut self, payload: &[u8], params: &AdvParams) -> Result<(), AdvError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: Bluedroid copies the raw payload before returning.
            let rc = unsafe {
                esp_idf_svc::sys::esp_ble_gap_config_adv_data_raw(
                    payload.as_ptr() as *mut u8,
                    payload.len() as u32,
                )
            };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(adv_err(rc));
            }
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim.payload.clear();
            self.sim
                .payload
                .extend_from_slice(payload)
                .map_err(|()| AdvError::ResourceExhausted)?;
        }
        self.params = Some(*params);
        Ok(())
    }

    fn start(&mut self, kind: AdvKind) -> Result<(), AdvError> {
        let params = self.params.ok_or(AdvError::InvalidState)?;

        #[cfg(target_os = "espidf")]
        {
            use esp_idf_svc::sys::*;
            // SAFETY: all-zero is valid for the remaining (peer address) fields.
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: params.interval,
                adv_int_max: params.interval,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..unsafe { core::mem::zeroed() }
            };
            // SAFETY: adv_params outlives the call.
            let rc = unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
            if rc != ESP_OK as i32 {
                return Err(adv_err(rc));
            }
            if params.duration > 0 {
                // SAFETY: adv_window was created in new(); main task only.
                unsafe {
                    esp_timer_stop(self.adv_window);
                    esp_timer_start_once(self.adv_window, u64::from(params.duration) * 10_000);
                }
            }
        }

        self.advertising = true;
        info!(
            "BLE: advertising {:?} every {} ms as '{}'",
            kind,
            params.interval_ms(),
            self.device_name
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AdvError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: adv_window was created in new(); stopping an idle
            // advertiser or timer is harmless.
            unsafe {
                esp_idf_svc::sys::esp_timer_stop(self.adv_window);
                if self.advertising {
                    let rc = esp_idf_svc::sys::esp_ble_gap_stop_advertising();
                    if rc != esp_idf_svc::sys::ESP_OK as i32 {
                        return Err(adv_err(rc));
                    }
                }
            }
        }
        self.advertising = false;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// GattPort implementation
// ───────────────────────────────────────────────────────────────

impl GattPort for BleAdapter {
    fn notify(
        &mut self,
        peer: ConnHandle,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> Result<(), NotifyError> {
        if data.len() > CharacteristicId::MAX_LEN {
            return Err(NotifyError::PayloadTooLarge);
        }

        #[cfg(target_os = "espidf")]
        {
            let (gatts_if, conn) = current_peer().ok_or(NotifyError::PeerInvalid)?;
            if conn != peer.0 {
                return Err(NotifyError::PeerInvalid);
            }
            let handle = stack::attr_handle(characteristic).ok_or(NotifyError::Stack(-1))?;
            // SAFETY: Bluedroid copies the value before returning.
            let rc = unsafe {
                esp_idf_svc::sys::esp_ble_gatts_send_indicate(
                    gatts_if,
                    conn,
                    handle,
                    data.len() as u16,
                    data.as_ptr() as *mut u8,
                    false,
                )
            };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(NotifyError::Stack(rc));
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            if self.sim.peer != Some(peer) {
                return Err(NotifyError::PeerInvalid);
            }
            log::debug!("BLE(sim): notify {} {:?} {:02X?}", peer, characteristic, data);
        }
        Ok(())
    }

    fn set_value(
        &mut self,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> Result<(), SetValueError> {
        if data.len() > CharacteristicId::MAX_LEN {
            return Err(SetValueError::TooLarge);
        }

        #[cfg(target_os = "espidf")]
        {
            let handle = stack::attr_handle(characteristic).ok_or(SetValueError::NotFound)?;
            // SAFETY: Bluedroid copies the value before returning.
            let rc = unsafe {
                esp_idf_svc::sys::esp_ble_gatts_set_attr_value(
                    handle,
                    data.len() as u16,
                    data.as_ptr(),
                )
            };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(SetValueError::NotFound);
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let idx = CharacteristicId::ALL
                .iter()
                .position(|c| *c == characteristic)
                .ok_or(SetValueError::NotFound)?;
            let slot = &mut self.sim.values[idx];
            slot.clear();
            slot.extend_from_slice(data)
                .map_err(|()| SetValueError::TooLarge)?;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const MAX_BONDS: usize = 15;

#[cfg(target_os = "espidf")]
fn bonded_devices(
) -> Result<heapless::Vec<esp_idf_svc::sys::esp_ble_bond_dev_t, MAX_BONDS>, BondError> {
    use esp_idf_svc::sys::*;
    let mut list: heapless::Vec<esp_ble_bond_dev_t, MAX_BONDS> = heapless::Vec::new();
    // SAFETY: the list buffer holds MAX_BONDS entries and Bluedroid writes
    // at most `num` of them.
    unsafe {
        let mut num = esp_ble_get_bond_device_num().clamp(0, MAX_BONDS as i32);
        let mut raw: [esp_ble_bond_dev_t; MAX_BONDS] = core::mem::zeroed();
        let rc = esp_ble_get_bond_device_list(&mut num, raw.as_mut_ptr());
        if rc != ESP_OK as i32 {
            return Err(BondError::Stack(rc));
        }
        for dev in raw.into_iter().take(num.max(0) as usize) {
            let _ = list.push(dev);
        }
    }
    Ok(list)
}

impl LinkPort for BleAdapter {
    fn request_security(&mut self, peer: ConnHandle) -> Result<(), LinkError> {
        #[cfg(target_os = "espidf")]
        {
            let (_, conn) = current_peer().ok_or(LinkError::NotConnected)?;
            if conn != peer.0 {
                return Err(LinkError::NotConnected);
            }
            let mut addr = match stack::PEER_ADDR.lock() {
                Ok(a) => *a,
                Err(_) => return Err(LinkError::Stack(-1)),
            };
            // SAFETY: addr is a 6-byte device address that outlives the call.
            let rc = unsafe {
                esp_idf_svc::sys::esp_ble_set_encryption(
                    addr.as_mut_ptr(),
                    esp_idf_svc::sys::esp_ble_sec_act_t_ESP_BLE_SEC_ENCRYPT_NO_MITM,
                )
            };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(LinkError::Stack(rc));
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            if self.sim.peer != Some(peer) {
                return Err(LinkError::NotConnected);
            }
            self.sim.bonds = self.sim.bonds.saturating_add(1);
            queue(Event::SecurityResult {
                handle: peer,
                outcome: crate::events::SecurityOutcome::Success,
            });
        }
        info!("BLE: security requested for {}", peer);
        Ok(())
    }

    fn disconnect(&mut self, peer: ConnHandle) -> Result<(), LinkError> {
        #[cfg(target_os = "espidf")]
        {
            let (gatts_if, conn) = current_peer().ok_or(LinkError::NotConnected)?;
            if conn != peer.0 {
                return Err(LinkError::NotConnected);
            }
            // SAFETY: plain stack call with a live connection id.
            let rc = unsafe { esp_idf_svc::sys::esp_ble_gatts_close(gatts_if, conn) };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(LinkError::Stack(rc));
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            if self.sim.peer != Some(peer) {
                return Err(LinkError::NotConnected);
            }
            // Local host termination.
            self.sim_disconnect(0x16);
        }
        Ok(())
    }

    fn delete_bonds(&mut self) -> Result<(), BondError> {
        #[cfg(target_os = "espidf")]
        {
            let bonds = bonded_devices()?;
            if bonds.is_empty() {
                queue(Event::BondsDeleted);
            }
            for mut dev in bonds {
                // SAFETY: bd_addr is a 6-byte address owned by `dev`.
                let rc = unsafe {
                    esp_idf_svc::sys::esp_ble_remove_bond_device(dev.bd_addr.as_mut_ptr())
                };
                if rc != esp_idf_svc::sys::ESP_OK as i32 {
                    return Err(BondError::Stack(rc));
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.sim.bonds = 0;
            queue(Event::BondsDeleted);
        }
        info!("BLE: bond purge requested");
        Ok(())
    }

    fn collect_garbage(&mut self) -> Result<(), BondError> {
        // Bluedroid has no compaction; free the oldest slot instead.
        #[cfg(target_os = "espidf")]
        {
            let bonds = bonded_devices()?;
            let Some(mut oldest) = bonds.into_iter().next() else {
                return Err(BondError::NoSpace);
            };
            // SAFETY: bd_addr is a 6-byte address owned by `oldest`.
            let rc = unsafe {
                esp_idf_svc::sys::esp_ble_remove_bond_device(oldest.bd_addr.as_mut_ptr())
            };
            if rc != esp_idf_svc::sys::ESP_OK as i32 {
                return Err(BondError::Stack(rc));
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            if self.sim.bonds == 0 {
                return Err(BondError::NoSpace);
            }
            self.sim.bonds -= 1;
        }
        Ok(())
    }
}
