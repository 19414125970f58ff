// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]

mod codegen;
mod common;
mod eval;
mod place;
