//! Built-in demonstration data

use crate::simulation::SimulationInputs;
use crate::triangle::Triangle;

/// Cumulative paid losses of the RAA reinsurance triangle (1981-1990)
pub fn raa_triangle() -> Triangle {
    Triangle::from_rows(&[
        vec![5012.0, 8269.0, 10907.0, 11805.0, 13539.0, 16181.0, 18009.0, 18608.0, 18662.0, 18834.0],
        vec![106.0, 4285.0, 5396.0, 10666.0, 13782.0, 15599.0, 15496.0, 16169.0, 16704.0],
        vec![3410.0, 8992.0, 13873.0, 16141.0, 18735.0, 22214.0, 22863.0, 23466.0],
        vec![5655.0, 11555.0, 15766.0, 21266.0, 23425.0, 26083.0, 27067.0],
        vec![1092.0, 9565.0, 15836.0, 22169.0, 25955.0, 26180.0],
        vec![1513.0, 6445.0, 11702.0, 12935.0, 15852.0],
        vec![557.0, 4020.0, 10946.0, 12314.0],
        vec![1351.0, 6947.0, 13112.0],
        vec![3133.0, 5395.0],
        vec![2063.0],
    ])
}

/// RAA with unit exposure, uniform weights, no tail and no discounting
pub fn raa_inputs() -> SimulationInputs {
    let triangle = raa_triangle();
    let exposure = vec![1.0; triangle.rows()];
    SimulationInputs::from_triangle(triangle, exposure)
}
