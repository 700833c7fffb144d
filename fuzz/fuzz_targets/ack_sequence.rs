// Copyright (c) 2024 The TQUIC Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![no_main]

use std::time::Duration;
use std::time::Instant;

use libfuzzer_sys::fuzz_target;

use bwprobe::build_congestion_controller;
use bwprobe::CongestionConfig;
use bwprobe::Error;
use bwprobe::SamplingVariant;
use bwprobe::SocketState;

// Each ack is encoded in 6 bytes: acked segments (1), RTT in 100us units
// (2), arrival gap in us (2) and a flag byte selecting the timer poll.
const ACK_LEN: usize = 6;

fuzz_target!(|data: &[u8]| {
    let mut conf = CongestionConfig::default();
    if data.first().map_or(false, |b| b & 1 == 1) {
        conf.set_sampling_variant(SamplingVariant::PerRtt);
    }

    let mut cc = build_congestion_controller(&conf);
    let mut sock = SocketState::new(&conf);
    let mut now = Instant::now();

    for ack in data.chunks_exact(ACK_LEN) {
        let acked = ack[0] as u32 % 16;
        let rtt = Duration::from_micros(u16::from_le_bytes([ack[1], ack[2]]) as u64 * 100);
        now += Duration::from_micros(u16::from_le_bytes([ack[3], ack[4]]) as u64);

        match cc.on_ack(acked, rtt, now, &sock) {
            Ok(()) => assert!(!rtt.is_zero()),
            Err(e) => assert_eq!(e, Error::InvalidSample),
        }
        if ack[5] & 1 == 1 {
            if let Some(timeout) = cc.timeout() {
                cc.on_timeout(timeout, &sock);
            }
        }
        cc.increase_window(&mut sock, acked);

        assert!(cc.bandwidth().is_finite());
        assert!(cc.bandwidth() >= 0.0);
        assert_eq!(cc.slow_start_threshold(), u64::MAX);
    }
});
