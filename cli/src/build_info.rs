// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub const CORALCTL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    CORALCTL_VERSION
}
