// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::Addr;
use hefl_client::FederationClient;
use hefl_config::ClientConfig;
use hefl_data::DataStore;
use hefl_defender::Defender;
use hefl_gateway::Gateway;
use hefl_protocol::{Caller, DefenderLink, GatewayLink};
use hefl_utils::SharedRng;

/// Handle to a running Gateway and Defender pair
#[derive(Clone)]
pub struct Federation {
    gateway: Addr<Gateway>,
    defender: Addr<Defender>,
    store: DataStore,
    rng: SharedRng,
    client: ClientConfig,
    max_chunks_per_tx: usize,
}

impl Federation {
    pub(crate) fn new(
        gateway: Addr<Gateway>,
        defender: Addr<Defender>,
        store: DataStore,
        rng: SharedRng,
        client: ClientConfig,
        max_chunks_per_tx: usize,
    ) -> Self {
        Self {
            gateway,
            defender,
            store,
            rng,
            client,
            max_chunks_per_tx,
        }
    }

    pub fn gateway(&self) -> &Addr<Gateway> {
        &self.gateway
    }

    pub fn defender(&self) -> &Addr<Defender> {
        &self.defender
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn max_chunks_per_tx(&self) -> usize {
        self.max_chunks_per_tx
    }

    pub fn gateway_link(&self, caller: Caller) -> GatewayLink {
        GatewayLink::new(self.gateway.clone().recipient(), caller)
    }

    pub fn defender_link(&self, caller: Caller) -> DefenderLink {
        DefenderLink::new(self.defender.clone().recipient(), caller)
    }

    /// A participant identified by `identity`, for example a certificate
    pub fn client(&self, identity: &str) -> FederationClient {
        FederationClient::new(
            self.gateway_link(Caller::client(identity)),
            self.rng.clone(),
            &self.client,
            self.max_chunks_per_tx,
        )
    }
}
