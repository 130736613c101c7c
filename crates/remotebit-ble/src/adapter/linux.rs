//! Linux host transport using bluer (BlueZ)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicWrite, CharacteristicWriteMethod, Service,
};
use futures::FutureExt;
use remotebit_core::{
    ChannelConfig, CharacteristicId, HostTransport, PeerWriteHandler, SecurityLevel,
};
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::error::BleTransportError;
use crate::protocol::generate_device_name;

use super::TransportSetup;

// ----------------------------------------------------------------------------
// Linux Implementation
// ----------------------------------------------------------------------------

/// BlueZ GATT peripheral serving the remote:bit service
///
/// Outbound values go through a watch channel: each notification session forwards the
/// latest value and skips any it missed. A peer counts as connected while at least one
/// notification session is open.
pub struct BluezTransport {
    _session: bluer::Session,
    adapter_name: String,
    _application: ApplicationHandle,
    advertisement: Option<AdvertisementHandle>,
    outbound: watch::Sender<Vec<u8>>,
    sessions: Arc<AtomicUsize>,
}

impl BluezTransport {
    async fn open_adapter() -> Result<(bluer::Session, bluer::Adapter), BleTransportError> {
        let session = bluer::Session::new()
            .await
            .map_err(|e| BleTransportError::SessionFailed(e.to_string()))?;

        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| BleTransportError::AdapterNotAvailable)?;

        // Enable adapter if needed
        if !adapter.is_powered().await.unwrap_or(false) {
            adapter
                .set_powered(true)
                .await
                .map_err(|e| BleTransportError::PowerOnFailed(e.to_string()))?;
        }

        info!("Linux BLE adapter {} initialized", adapter.name());
        Ok((session, adapter))
    }

    fn inbound_characteristic(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Characteristic {
        Characteristic {
            uuid: config.layout.characteristic_uuid(CharacteristicId::Inbound),
            write: Some(CharacteristicWrite {
                write: true,
                write_without_response: true,
                encrypt_write: config.security == SecurityLevel::Encrypted,
                encrypt_authenticated_write: config.security == SecurityLevel::Authenticated,
                method: CharacteristicWriteMethod::Fun(Box::new(move |value, request| {
                    let inbound = inbound.clone();
                    async move {
                        trace!(
                            "Write from {}: {}",
                            request.device_address,
                            hex::encode(&value)
                        );
                        inbound.handle(CharacteristicId::Inbound, &value);
                        Ok(())
                    }
                    .boxed()
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn outbound_characteristic(
        config: &ChannelConfig,
        values: watch::Receiver<Vec<u8>>,
        sessions: Arc<AtomicUsize>,
    ) -> Characteristic {
        Characteristic {
            uuid: config.layout.characteristic_uuid(CharacteristicId::Outbound),
            notify: Some(CharacteristicNotify {
                notify: true,
                method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                    let values = values.clone();
                    let sessions = sessions.clone();
                    async move {
                        tokio::spawn(forward_notifications(notifier, values, sessions));
                    }
                    .boxed()
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Forward outbound values to one subscribed peer until it unsubscribes
async fn forward_notifications(
    mut notifier: CharacteristicNotifier,
    mut values: watch::Receiver<Vec<u8>>,
    sessions: Arc<AtomicUsize>,
) {
    let open = sessions.fetch_add(1, Ordering::SeqCst) + 1;
    info!("Peer subscribed to notifications ({} open)", open);

    // Only values written after the subscription are delivered
    values.borrow_and_update();

    loop {
        tokio::select! {
            _ = notifier.stopped() => break,
            changed = values.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let value = values.borrow_and_update().clone();
        if let Err(e) = notifier.notify(value).await {
            debug!("Notification session ended: {}", e);
            break;
        }
    }

    let open = sessions.fetch_sub(1, Ordering::SeqCst) - 1;
    info!("Peer unsubscribed from notifications ({} open)", open);
}

#[async_trait::async_trait]
impl TransportSetup for BluezTransport {
    async fn register(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Result<Self, BleTransportError> {
        let (session, adapter) = Self::open_adapter().await?;

        let (outbound, values) = watch::channel(Vec::new());
        let sessions = Arc::new(AtomicUsize::new(0));

        let application = Application {
            services: vec![Service {
                uuid: config.layout.service_uuid(),
                primary: true,
                characteristics: vec![
                    Self::inbound_characteristic(config, inbound),
                    Self::outbound_characteristic(config, values, sessions.clone()),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let application = adapter
            .serve_gatt_application(application)
            .await
            .map_err(|e| BleTransportError::ServiceRegistrationFailed(e.to_string()))?;
        debug!("GATT application registered on {}", adapter.name());

        let advertisement = if config.advertise {
            let address = adapter
                .address()
                .await
                .map_err(|e| BleTransportError::AdvertisingFailed(e.to_string()))?;
            let device_name = generate_device_name(&config.device_name_prefix, &address.0[4..]);

            let advertisement = Advertisement {
                advertisement_type: bluer::adv::Type::Peripheral,
                service_uuids: [config.layout.service_uuid()].into_iter().collect(),
                local_name: Some(device_name.clone()),
                tx_power: Some(config.tx_power.dbm()),
                discoverable: Some(true),
                ..Default::default()
            };

            let handle = adapter
                .advertise(advertisement)
                .await
                .map_err(|e| BleTransportError::AdvertisingFailed(e.to_string()))?;

            info!(
                "Started BLE advertising as '{}' at {} dBm",
                device_name,
                config.tx_power.dbm()
            );
            Some(handle)
        } else {
            None
        };

        Ok(Self {
            _session: session,
            adapter_name: adapter.name().to_string(),
            _application: application,
            advertisement,
            outbound,
            sessions,
        })
    }

    fn is_advertising(&self) -> bool {
        self.advertisement.is_some()
    }
}

impl HostTransport for BluezTransport {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        if characteristic != CharacteristicId::Outbound {
            debug!("Ignoring notify request for {}", characteristic);
            return;
        }
        self.outbound.send_replace(data.to_vec());
    }

    fn is_connected(&self) -> bool {
        self.sessions.load(Ordering::SeqCst) > 0
    }

    fn name(&self) -> &'static str {
        "bluez"
    }
}

impl Drop for BluezTransport {
    fn drop(&mut self) {
        // Dropping the handles withdraws the advertisement and the GATT application
        if self.advertisement.take().is_some() {
            info!("Stopped BLE advertising on {}", self.adapter_name);
        }
    }
}
