//! Import of the published TensorFlow checkpoint.
//!
//! The checkpoint variables are expected as an `.npz` export keyed by their
//! TF names (`vggish/conv1/weights`, `vggish/fc1/fc1_2/biases`, ...). Conv
//! kernels are HWIO and dense kernels are `[in, out]`.

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::{Module, Param},
    nn::{Linear, conv::Conv2d},
    tensor::{Tensor, TensorData, backend::Backend},
};
use ndarray::{ArrayD, IxDyn};

use super::{Vggish, VggishConfig, WeightsRecorder, config_path};
use crate::error::{Error, Result};
use crate::npz::NpzArchive;

const CONV_SCOPES: [&str; 6] = [
    "vggish/conv1",
    "vggish/conv2",
    "vggish/conv3/conv3_1",
    "vggish/conv3/conv3_2",
    "vggish/conv4/conv4_1",
    "vggish/conv4/conv4_2",
];

const FC_SCOPES: [&str; 3] = ["vggish/fc1/fc1_1", "vggish/fc1/fc1_2", "vggish/fc2"];

/// Build the network from an `.npz` export of the TF checkpoint.
pub fn import_npz_checkpoint<B: Backend>(
    path: &Path,
    config: &VggishConfig,
    device: &B::Device,
) -> Result<Vggish<B>> {
    let mut npz = NpzArchive::open(path)?;
    let mut model = config.init::<B>(device);

    {
        let convs = [
            &mut model.conv1,
            &mut model.conv2,
            &mut model.conv3_1,
            &mut model.conv3_2,
            &mut model.conv4_1,
            &mut model.conv4_2,
        ];
        for (conv, scope) in convs.into_iter().zip(CONV_SCOPES) {
            load_conv(&mut npz, scope, conv, device)?;
        }
    }

    {
        let fcs = [&mut model.fc1_1, &mut model.fc1_2, &mut model.fc2];
        for (fc, scope) in fcs.into_iter().zip(FC_SCOPES) {
            load_linear(&mut npz, scope, fc, device)?;
        }
    }

    log::info!("imported VGGish variables from {}", npz.path().display());
    Ok(model)
}

/// Import the `.npz` export and save it as a burn record at `out`, with the
/// network config next to it so loading rebuilds the same network.
pub fn convert_checkpoint<B: Backend>(
    npz: &Path,
    out: &Path,
    config: &VggishConfig,
    device: &B::Device,
) -> Result<PathBuf> {
    let model = import_npz_checkpoint::<B>(npz, config, device)?;
    let out = out.with_extension("mpk");
    model
        .save_file(out.clone(), &WeightsRecorder::new())
        .map_err(|e| Error::Record(format!("{}: {e:?}", out.display())))?;

    let config_out = config_path(&out);
    config
        .save(&config_out)
        .map_err(|e| Error::io(&config_out, e))?;
    log::info!("wrote {} and {}", out.display(), config_out.display());
    Ok(out)
}

fn load_conv<B: Backend>(
    npz: &mut NpzArchive,
    scope: &str,
    conv: &mut Conv2d<B>,
    device: &B::Device,
) -> Result<()> {
    let expected = conv.weight.val().dims();
    let kernel = npz.array_f32(&format!("{scope}/weights"))?;
    // HWIO -> OIHW
    let kernel = kernel.permuted_axes(IxDyn(&[3, 2, 0, 1]));
    conv.weight = Param::from_tensor(tensor::<B, 4>(scope, kernel, expected, device)?);

    let biases = npz.array_f32(&format!("{scope}/biases"))?;
    conv.bias = Some(Param::from_tensor(tensor::<B, 1>(
        scope,
        biases,
        [expected[0]],
        device,
    )?));
    Ok(())
}

fn load_linear<B: Backend>(
    npz: &mut NpzArchive,
    scope: &str,
    fc: &mut Linear<B>,
    device: &B::Device,
) -> Result<()> {
    // burn stores dense weights as [in, out], same as TF.
    let expected = fc.weight.val().dims();
    let kernel = npz.array_f32(&format!("{scope}/weights"))?;
    fc.weight = Param::from_tensor(tensor::<B, 2>(scope, kernel, expected, device)?);

    let biases = npz.array_f32(&format!("{scope}/biases"))?;
    fc.bias = Some(Param::from_tensor(tensor::<B, 1>(
        scope,
        biases,
        [expected[1]],
        device,
    )?));
    Ok(())
}

fn tensor<B: Backend, const D: usize>(
    scope: &str,
    array: ArrayD<f32>,
    expected: [usize; D],
    device: &B::Device,
) -> Result<Tensor<B, D>> {
    if array.shape() != expected.as_slice() {
        return Err(Error::Shape(format!(
            "{scope}: checkpoint has {:?}, model expects {:?}",
            array.shape(),
            expected
        )));
    }
    let data: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_data(TensorData::new(data, expected), device))
}
