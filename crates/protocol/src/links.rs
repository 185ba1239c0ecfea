// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    decode_response, AggregationOutcome, ApplyPoisonDefense, Call, Caller, CommitLocalModel,
    CommittedModel, GetBenignModelIds, GetCommittedLocalModels, GetEncryptionContext,
    GetGlobalModel, GetTrainingSessions, GlobalModelView, GuardedDecrypt, InitEncryptionContext,
    InitSession, Invoke, PoisonDefenseOutcome, PrivateAggregation, ProtocolError, Recovered,
    Service, SessionRecord, StoreLocalModelChunk, StoredChunk,
};
use actix::Recipient;
use anyhow::Result;
use hefl_fhe::EncryptionContext;
use tracing::trace;

/// Sends typed calls to one service on behalf of one caller
#[derive(Clone)]
pub struct ServiceLink {
    service: Service,
    caller: Caller,
    recipient: Recipient<Invoke>,
}

impl ServiceLink {
    pub fn new(service: Service, caller: Caller, recipient: Recipient<Invoke>) -> Self {
        Self {
            service,
            caller,
            recipient,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Invoke `C` and decode its framed response. A failing callee surfaces as
    /// [`ProtocolError::CalleeFailed`] wrapping the original error.
    pub async fn call<C: Call>(&self, request: &C) -> Result<C::Response> {
        let operation = C::OPERATION;
        if operation.service() != self.service {
            return Err(ProtocolError::WrongService {
                operation,
                service: self.service,
            }
            .into());
        }

        let invoke = Invoke::call(request, self.caller.clone())?;
        trace!("{} -> {}::{}", self.caller, self.service, operation);
        let raw = self.recipient.send(invoke).await?.map_err(|e| {
            let reason = format!("{e:#}");
            e.context(ProtocolError::CalleeFailed { operation, reason })
        })?;
        Ok(decode_response(&raw)?)
    }
}

/// The Defender as seen by the Gateway and by clients
#[derive(Clone)]
pub struct DefenderLink(ServiceLink);

impl DefenderLink {
    pub fn new(recipient: Recipient<Invoke>, caller: Caller) -> Self {
        Self(ServiceLink::new(Service::Defender, caller, recipient))
    }

    pub fn caller(&self) -> &Caller {
        self.0.caller()
    }

    pub async fn init_encryption_context(&self) -> Result<EncryptionContext> {
        self.0.call(&InitEncryptionContext).await
    }

    pub async fn guarded_decrypt(&self, request: &GuardedDecrypt) -> Result<Vec<Recovered>> {
        Ok(self.0.call(request).await?.values)
    }

    pub async fn benign_model_ids(&self) -> Result<Vec<String>> {
        Ok(self.0.call(&GetBenignModelIds).await?.ids)
    }

    pub async fn apply_poison_defense(&self) -> Result<PoisonDefenseOutcome> {
        self.0.call(&ApplyPoisonDefense).await
    }
}

/// The Gateway as seen by the Defender and by clients
#[derive(Clone)]
pub struct GatewayLink(ServiceLink);

impl GatewayLink {
    pub fn new(recipient: Recipient<Invoke>, caller: Caller) -> Self {
        Self(ServiceLink::new(Service::Gateway, caller, recipient))
    }

    pub fn caller(&self) -> &Caller {
        self.0.caller()
    }

    /// Same gateway, different caller
    pub fn as_caller(&self, caller: Caller) -> Self {
        Self(ServiceLink::new(
            Service::Gateway,
            caller,
            self.0.recipient.clone(),
        ))
    }

    pub async fn init_session(&self, request: &InitSession) -> Result<()> {
        self.0.call(request).await?;
        Ok(())
    }

    pub async fn encryption_context(&self) -> Result<EncryptionContext> {
        self.0.call(&GetEncryptionContext).await
    }

    pub async fn training_sessions(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.0.call(&GetTrainingSessions).await?.sessions)
    }

    pub async fn store_local_model_chunk(
        &self,
        request: &StoreLocalModelChunk,
    ) -> Result<StoredChunk> {
        self.0.call(request).await
    }

    pub async fn commit_local_model(&self, request: &CommitLocalModel) -> Result<f64> {
        Ok(self.0.call(request).await?.score)
    }

    pub async fn global_model(&self) -> Result<GlobalModelView> {
        self.0.call(&GetGlobalModel).await
    }

    pub async fn committed_local_models(&self) -> Result<Vec<CommittedModel>> {
        Ok(self.0.call(&GetCommittedLocalModels).await?.models)
    }

    pub async fn private_aggregation(&self, chunk_limit: usize) -> Result<AggregationOutcome> {
        self.0.call(&PrivateAggregation { chunk_limit }).await
    }
}
