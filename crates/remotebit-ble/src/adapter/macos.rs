//! macOS host transport using Core Bluetooth

use std::ffi::c_void;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use cocoa::base::{id, nil};
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel, BOOL, NO};
use objc::{class, msg_send, sel, sel_impl};
use objc_foundation::{INSData, INSString, NSData, NSString};
use remotebit_core::{ChannelConfig, CharacteristicId, HostTransport, PeerWriteHandler};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::BleTransportError;
use crate::protocol::{generate_device_name, requires_encryption};

use super::TransportSetup;

// ----------------------------------------------------------------------------
// Core Bluetooth Constants
// ----------------------------------------------------------------------------

const PROPERTY_WRITE_WITHOUT_RESPONSE: u64 = 0x04;
const PROPERTY_WRITE: u64 = 0x08;
const PROPERTY_NOTIFY: u64 = 0x10;

const PERMISSION_READABLE: u64 = 0x01;
const PERMISSION_WRITEABLE: u64 = 0x02;
const PERMISSION_READ_ENCRYPTION_REQUIRED: u64 = 0x04;
const PERMISSION_WRITE_ENCRYPTION_REQUIRED: u64 = 0x08;

const MANAGER_STATE_POWERED_ON: i64 = 5;
const ATT_SUCCESS: i64 = 0;

const DELEGATE_CLASS: &str = "RemoteBitPeripheralDelegate";
const STATE_IVAR: &str = "_state";

type DispatchQueue = *mut c_void;

extern "C" {
    fn dispatch_queue_create(label: *const c_char, attr: *mut c_void) -> DispatchQueue;
    fn dispatch_sync_f(queue: DispatchQueue, context: *mut c_void, work: extern "C" fn(*mut c_void));
    fn dispatch_release(object: DispatchQueue);
}

extern "C" fn queue_barrier(_context: *mut c_void) {}

/// Block until every callback already queued on `queue` has returned
///
/// Must not be called from `queue` itself.
unsafe fn drain_queue(queue: DispatchQueue) {
    dispatch_sync_f(queue, std::ptr::null_mut(), queue_barrier);
}

// ----------------------------------------------------------------------------
// Delegate State
// ----------------------------------------------------------------------------

/// State shared with the delegate, which runs on the Core Bluetooth queue
struct DelegateState {
    inbound: PeerWriteHandler,
    service: id,
    inbound_characteristic: id,
    advertising_data: Option<id>,
    service_added: AtomicBool,
    advertising: AtomicBool,
    subscribers: AtomicUsize,
}

unsafe impl Send for DelegateState {}
unsafe impl Sync for DelegateState {}

unsafe fn delegate_state(this: &Object) -> Option<&DelegateState> {
    let ptr: *mut c_void = *this.get_ivar(STATE_IVAR);
    (ptr as *const DelegateState).as_ref()
}

extern "C" fn did_update_state(this: &Object, _cmd: Sel, manager: id) {
    unsafe {
        let Some(state) = delegate_state(this) else {
            return;
        };

        let manager_state: i64 = msg_send![manager, state];
        debug!("CBPeripheralManager state changed to {}", manager_state);
        if manager_state != MANAGER_STATE_POWERED_ON {
            state.advertising.store(false, Ordering::SeqCst);
            return;
        }

        if !state.service_added.swap(true, Ordering::SeqCst) {
            let _: () = msg_send![manager, addService: state.service];
            info!("remote:bit service added to CBPeripheralManager");
        }

        if let Some(advertising_data) = state.advertising_data {
            let _: () = msg_send![manager, startAdvertising: advertising_data];
            state.advertising.store(true, Ordering::SeqCst);
            info!("Started macOS BLE advertising");
        }
    }
}

extern "C" fn did_receive_write_requests(this: &Object, _cmd: Sel, manager: id, requests: id) {
    unsafe {
        let Some(state) = delegate_state(this) else {
            return;
        };

        let count: usize = msg_send![requests, count];
        for index in 0..count {
            let request: id = msg_send![requests, objectAtIndex: index];
            let characteristic: id = msg_send![request, characteristic];
            let value: id = msg_send![request, value];

            if characteristic != state.inbound_characteristic {
                debug!("Ignoring write to a characteristic other than inbound");
                continue;
            }
            if value == nil {
                continue;
            }

            let data = &*(value as *const NSData);
            trace!("Peer write: {}", hex::encode(data.bytes()));
            state.inbound.handle(CharacteristicId::Inbound, data.bytes());
        }

        // One response covers the whole batch
        if count > 0 {
            let first: id = msg_send![requests, objectAtIndex: 0usize];
            let _: () = msg_send![manager, respondToRequest: first withResult: ATT_SUCCESS];
        }
    }
}

extern "C" fn did_subscribe(this: &Object, _cmd: Sel, _manager: id, _central: id, _characteristic: id) {
    unsafe {
        if let Some(state) = delegate_state(this) {
            let open = state.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Central subscribed to notifications ({} open)", open);
        }
    }
}

extern "C" fn did_unsubscribe(this: &Object, _cmd: Sel, _manager: id, _central: id, _characteristic: id) {
    unsafe {
        if let Some(state) = delegate_state(this) {
            let previous = state
                .subscribers
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
                .unwrap_or(0);
            info!(
                "Central unsubscribed from notifications ({} open)",
                previous.saturating_sub(1)
            );
        }
    }
}

fn delegate_class() -> Result<&'static Class, BleTransportError> {
    static REGISTER: Once = Once::new();

    REGISTER.call_once(|| {
        let Some(mut decl) = ClassDecl::new(DELEGATE_CLASS, class!(NSObject)) else {
            return;
        };
        decl.add_ivar::<*mut c_void>(STATE_IVAR);
        unsafe {
            decl.add_method(
                sel!(peripheralManagerDidUpdateState:),
                did_update_state as extern "C" fn(&Object, Sel, id),
            );
            decl.add_method(
                sel!(peripheralManager:didReceiveWriteRequests:),
                did_receive_write_requests as extern "C" fn(&Object, Sel, id, id),
            );
            decl.add_method(
                sel!(peripheralManager:central:didSubscribeToCharacteristic:),
                did_subscribe as extern "C" fn(&Object, Sel, id, id, id),
            );
            decl.add_method(
                sel!(peripheralManager:central:didUnsubscribeFromCharacteristic:),
                did_unsubscribe as extern "C" fn(&Object, Sel, id, id, id),
            );
        }
        decl.register();
    });

    Class::get(DELEGATE_CLASS).ok_or(BleTransportError::ClassNotAvailable {
        class: DELEGATE_CLASS,
    })
}

// ----------------------------------------------------------------------------
// macOS Implementation
// ----------------------------------------------------------------------------

/// CBPeripheralManager serving the remote:bit service
pub struct CoreBluetoothTransport {
    peripheral_manager: id,
    delegate: id,
    queue: DispatchQueue,
    outbound_characteristic: id,
    state: Arc<DelegateState>,
}

unsafe impl Send for CoreBluetoothTransport {}
unsafe impl Sync for CoreBluetoothTransport {}

fn class_named(name: &'static str) -> Result<&'static Class, BleTransportError> {
    Class::get(name).ok_or(BleTransportError::ClassNotAvailable { class: name })
}

unsafe fn cbuuid(uuid: &Uuid) -> Result<id, BleTransportError> {
    let string = NSString::from_str(&uuid.to_string());
    let cbuuid: id = msg_send![class_named("CBUUID")?, UUIDWithString: &*string];
    Ok(cbuuid)
}

unsafe fn mutable_characteristic(
    uuid: &Uuid,
    properties: u64,
    permissions: u64,
) -> Result<id, BleTransportError> {
    let characteristic: id = msg_send![class_named("CBMutableCharacteristic")?, alloc];
    let characteristic: id = msg_send![characteristic,
        initWithType: cbuuid(uuid)?
        properties: properties
        value: nil
        permissions: permissions
    ];
    if characteristic == nil {
        return Err(BleTransportError::ServiceRegistrationFailed(format!(
            "Failed to create characteristic {}",
            uuid
        )));
    }
    Ok(characteristic)
}

impl CoreBluetoothTransport {
    /// Build the service with its inbound and outbound characteristics
    unsafe fn create_service(config: &ChannelConfig) -> Result<(id, id, id), BleTransportError> {
        let layout = &config.layout;
        let encrypted = requires_encryption(config.security);

        let inbound = mutable_characteristic(
            &layout.characteristic_uuid(CharacteristicId::Inbound),
            PROPERTY_WRITE | PROPERTY_WRITE_WITHOUT_RESPONSE,
            if encrypted {
                PERMISSION_WRITE_ENCRYPTION_REQUIRED
            } else {
                PERMISSION_WRITEABLE
            },
        )?;
        let outbound = mutable_characteristic(
            &layout.characteristic_uuid(CharacteristicId::Outbound),
            PROPERTY_NOTIFY,
            if encrypted {
                PERMISSION_READ_ENCRYPTION_REQUIRED
            } else {
                PERMISSION_READABLE
            },
        )?;

        let service: id = msg_send![class_named("CBMutableService")?, alloc];
        let service: id = msg_send![service, initWithType: cbuuid(&layout.service_uuid())? primary: true];
        if service == nil {
            return Err(BleTransportError::ServiceRegistrationFailed(
                "Failed to create CBMutableService".into(),
            ));
        }

        let characteristics = [inbound, outbound];
        let characteristics: id = msg_send![class_named("NSArray")?,
            arrayWithObjects: characteristics.as_ptr()
            count: characteristics.len()
        ];
        let _: () = msg_send![service, setCharacteristics: characteristics];

        Ok((service, inbound, outbound))
    }

    unsafe fn advertising_data(
        config: &ChannelConfig,
        device_name: &str,
    ) -> Result<id, BleTransportError> {
        let local_name_key = NSString::from_str("kCBAdvDataLocalName");
        let local_name = NSString::from_str(device_name);

        let service_uuids_key = NSString::from_str("kCBAdvDataServiceUUIDs");
        let service_uuid = [cbuuid(&config.layout.service_uuid())?];
        let service_uuids: id = msg_send![class_named("NSArray")?,
            arrayWithObjects: service_uuid.as_ptr()
            count: 1usize
        ];

        let keys: [id; 2] = [
            &*local_name_key as *const NSString as id,
            &*service_uuids_key as *const NSString as id,
        ];
        let values: [id; 2] = [&*local_name as *const NSString as id, service_uuids];
        let dictionary: id = msg_send![class_named("NSDictionary")?,
            dictionaryWithObjects: values.as_ptr()
            forKeys: keys.as_ptr()
            count: 2usize
        ];
        // Retained so the delegate can start advertising once the radio powers on
        let _: id = msg_send![dictionary, retain];
        Ok(dictionary)
    }
}

#[async_trait::async_trait]
impl TransportSetup for CoreBluetoothTransport {
    async fn register(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Result<Self, BleTransportError> {
        let device_name = generate_device_name(&config.device_name_prefix, &[]);

        unsafe {
            let (service, inbound_characteristic, outbound_characteristic) =
                Self::create_service(config)?;
            let advertising_data = if config.advertise {
                Some(Self::advertising_data(config, &device_name)?)
            } else {
                None
            };

            let state = Arc::new(DelegateState {
                inbound,
                service,
                inbound_characteristic,
                advertising_data,
                service_added: AtomicBool::new(false),
                advertising: AtomicBool::new(false),
                subscribers: AtomicUsize::new(0),
            });

            let delegate: id = msg_send![delegate_class()?, new];
            (*delegate).set_ivar::<*mut c_void>(
                STATE_IVAR,
                Arc::into_raw(state.clone()) as *mut c_void,
            );

            let queue = dispatch_queue_create(c"remotebit.peripheral".as_ptr(), std::ptr::null_mut());

            let peripheral_manager: id = msg_send![class_named("CBPeripheralManager")?, alloc];
            let peripheral_manager: id = msg_send![peripheral_manager,
                initWithDelegate: delegate
                queue: queue
                options: nil
            ];
            if peripheral_manager == nil {
                (*delegate).set_ivar::<*mut c_void>(STATE_IVAR, std::ptr::null_mut());
                drop(Arc::from_raw(Arc::as_ptr(&state)));
                let _: () = msg_send![delegate, release];
                dispatch_release(queue);
                return Err(BleTransportError::AdapterNotAvailable);
            }

            info!(
                "macOS CBPeripheralManager initialized for '{}', waiting for power on",
                device_name
            );

            Ok(Self {
                peripheral_manager,
                delegate,
                queue,
                outbound_characteristic,
                state,
            })
        }
    }

    fn is_advertising(&self) -> bool {
        self.state.advertising.load(Ordering::SeqCst)
    }
}

impl HostTransport for CoreBluetoothTransport {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        if characteristic != CharacteristicId::Outbound {
            debug!("Ignoring notify request for {}", characteristic);
            return;
        }

        unsafe {
            let value = NSData::with_bytes(data);
            let sent: BOOL = msg_send![self.peripheral_manager,
                updateValue: &*value
                forCharacteristic: self.outbound_characteristic
                onSubscribedCentrals: nil
            ];
            if sent == NO {
                warn!("Notification queue full, dropped {} bytes", data.len());
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state.subscribers.load(Ordering::SeqCst) > 0
    }

    fn name(&self) -> &'static str {
        "corebluetooth"
    }
}

impl Drop for CoreBluetoothTransport {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![self.peripheral_manager, stopAdvertising];
            let _: () = msg_send![self.peripheral_manager, removeAllServices];
            let _: () = msg_send![self.peripheral_manager, setDelegate: nil];

            // Callbacks dereference the state pointer on the queue; let them finish first
            drain_queue(self.queue);

            let ptr: *mut c_void = *(*self.delegate).get_ivar(STATE_IVAR);
            (*self.delegate).set_ivar::<*mut c_void>(STATE_IVAR, std::ptr::null_mut());
            if !ptr.is_null() {
                drop(Arc::from_raw(ptr as *const DelegateState));
            }

            if let Some(advertising_data) = self.state.advertising_data {
                let _: () = msg_send![advertising_data, release];
            }
            let _: () = msg_send![self.delegate, release];
            let _: () = msg_send![self.peripheral_manager, release];
            dispatch_release(self.queue);
        }
        info!("Stopped macOS BLE advertising");
    }
}
