use {
    crate::{ElementType, SegmentError, TensorInfo},
    base::{Vec2, nhwc_channels, nhwc_size},
    frame::{CHANNELS, FrameBuffer},
};

/// Width and height of an NHWC tensor (`dims[2]` by `dims[1]`).
pub fn spatial_size(info: &TensorInfo) -> Result<Vec2<usize>, SegmentError> {
    nhwc_size(&info.shape).map_err(|e| {
        SegmentError::InvalidShape(format!("tensor {} {:?}: {}", info.name, info.shape, e))
    })
}

/// Channel count of an NHWC tensor, 1 when the channel axis is absent.
pub fn channels(info: &TensorInfo) -> usize {
    nhwc_channels(&info.shape)
}

/// Resamples `frame` to the input tensor's spatial size.
pub fn fit_frame(frame: &FrameBuffer, info: &TensorInfo) -> Result<FrameBuffer, SegmentError> {
    let size = spatial_size(info)?;
    if size.is_empty() {
        return Err(SegmentError::InvalidShape(format!(
            "tensor {} has empty spatial size {}",
            info.name, size
        )));
    }
    Ok(frame.resize(size)?)
}

/// Writes `(pixel - mean) / scale` for every byte of `frame` into `data`.
///
/// `Float32` inputs receive the value as is; `UInt8` inputs receive it
/// converted with saturation.
pub fn fill_input(
    info: &TensorInfo,
    data: &mut [u8],
    frame: &FrameBuffer,
    mean: f32,
    scale: f32,
) -> Result<(), SegmentError> {
    let size = spatial_size(info)?;
    let wanted_channels = channels(info);
    if wanted_channels != CHANNELS {
        return Err(SegmentError::InvalidShape(format!(
            "input {} wants {} channels, image has {}",
            info.name, wanted_channels, CHANNELS
        )));
    }
    if frame.size != size {
        return Err(SegmentError::InvalidShape(format!(
            "input {} is {}, frame is {}",
            info.name, size, frame.size
        )));
    }
    let normalize = |pixel: u8| (pixel as f32 - mean) / scale;
    match info.element_type {
        ElementType::Float32 => {
            let needed = frame.data.len() * 4;
            if data.len() < needed {
                return Err(SegmentError::InvalidShape(format!(
                    "input {} holds {} bytes, needs {}",
                    info.name,
                    data.len(),
                    needed
                )));
            }
            for (out, &pixel) in data.chunks_exact_mut(4).zip(frame.data.iter()) {
                out.copy_from_slice(&normalize(pixel).to_ne_bytes());
            }
        }
        ElementType::UInt8 => {
            if data.len() < frame.data.len() {
                return Err(SegmentError::InvalidShape(format!(
                    "input {} holds {} bytes, needs {}",
                    info.name,
                    data.len(),
                    frame.data.len()
                )));
            }
            for (out, &pixel) in data.iter_mut().zip(frame.data.iter()) {
                *out = normalize(pixel) as u8;
            }
        }
        other => return Err(SegmentError::UnsupportedInputType(other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(element_type: ElementType, channels: usize) -> TensorInfo {
        let element_size = element_type.size().unwrap_or(1);
        TensorInfo {
            name: "input".to_string(),
            shape: vec![1, 2, 2, channels],
            element_type,
            byte_size: 4 * channels * element_size,
            quantization: None,
        }
    }

    #[test]
    fn test_float_normalization() {
        let info = input(ElementType::Float32, 3);
        let frame = FrameBuffer::filled(Vec2::new(2, 2), [0, 255, 128]);
        let mut data = vec![0u8; info.byte_size];
        fill_input(&info, &mut data, &frame, 127.5, 127.5).unwrap();
        let values: Vec<f32> = data
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values[0], -1.0);
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 0.5 / 127.5).abs() < 1e-6);
    }

    #[test]
    fn test_uint8_identity() {
        let info = input(ElementType::UInt8, 3);
        let frame = FrameBuffer::filled(Vec2::new(2, 2), [10, 20, 30]);
        let mut data = vec![0u8; info.byte_size];
        fill_input(&info, &mut data, &frame, 0.0, 1.0).unwrap();
        assert_eq!(data, frame.data);
    }

    #[test]
    fn test_unsupported_input_type() {
        let info = input(ElementType::Int8, 3);
        let frame = FrameBuffer::filled(Vec2::new(2, 2), [0, 0, 0]);
        let mut data = vec![0u8; info.byte_size];
        let err = fill_input(&info, &mut data, &frame, 0.0, 1.0);
        assert!(matches!(
            err,
            Err(SegmentError::UnsupportedInputType(ElementType::Int8))
        ));
    }

    #[test]
    fn test_channel_mismatch() {
        let info = input(ElementType::UInt8, 1);
        let frame = FrameBuffer::filled(Vec2::new(2, 2), [0, 0, 0]);
        let mut data = vec![0u8; 16];
        let err = fill_input(&info, &mut data, &frame, 0.0, 1.0);
        assert!(matches!(err, Err(SegmentError::InvalidShape(_))));
    }

    #[test]
    fn test_fit_frame_resizes() {
        let info = input(ElementType::UInt8, 3);
        let frame = FrameBuffer::filled(Vec2::new(8, 6), [50, 60, 70]);
        let fitted = fit_frame(&frame, &info).unwrap();
        assert_eq!(fitted.size, Vec2::new(2, 2));
        assert_eq!(fitted.pixel(1, 1), [50, 60, 70]);
    }
}
