// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

/// Every world state key used by the federation services
pub struct StoreKeys;

impl StoreKeys {
    pub fn sessions() -> String {
        String::from("//gateway/sessions")
    }

    pub fn encryption_context() -> String {
        String::from("//gateway/context")
    }

    pub fn global_model() -> String {
        String::from("//gateway/global_model")
    }

    pub fn global_chunks() -> String {
        String::from("//gateway/global_chunks")
    }

    pub fn local_models() -> String {
        String::from("//gateway/local_models")
    }

    pub fn scores() -> String {
        String::from("//gateway/scores")
    }

    pub fn staged_chunks() -> String {
        String::from("//gateway/chunks")
    }

    pub fn anomaly() -> String {
        String::from("//defender/anomaly")
    }

    pub fn benign() -> String {
        String::from("//defender/benign")
    }

    pub fn reward() -> String {
        String::from("//defender/reward")
    }
}
